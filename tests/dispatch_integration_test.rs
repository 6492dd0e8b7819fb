//! Dispatch integration tests
//!
//! These tests drive complete runs through `CliApp::run`: API and method
//! selection, binding, invocation and the escalation chain.

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use cliapi::dispatch::OutputBuffer;
use cliapi::help::{about_api, version_api};
use cliapi::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct DemoApi;

impl CliApi for DemoApi {}

#[derive(Default)]
struct EchoArguments {
    message: String,
}

impl ArgumentHolder for EchoArguments {
    fn describe(properties: &mut PropertySet<Self>) {
        properties.add(arg::text("message"), |a, v| a.message = v);
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.message.is_empty() {
            return Err(ValidationError::for_member("message", "Message must not be empty"));
        }
        Ok(())
    }
}

#[derive(Default)]
struct OtherApi;

impl CliApi for OtherApi {}

static ERROR_API_DISPOSED: AtomicUsize = AtomicUsize::new(0);

#[derive(Default)]
struct ErrorApi;

#[async_trait]
impl CliApi for ErrorApi {
    async fn dispose(&mut self) {
        ERROR_API_DISPOSED.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct HandlingApi;

impl CliApi for HandlingApi {}

#[async_trait]
impl ApiErrorHandler for HandlingApi {
    async fn handle_error(&mut self, context: &CliApiContext) -> i32 {
        let message = context.exception().map(|e| e.to_string()).unwrap_or_default();
        let _ = context.output().write_line(&format!("handled: {message}"));
        42
    }
}

fn demo_api() -> ApiDescriptor {
    ApiDescriptor::builder::<DemoApi>("demo")
        .title("Demo API")
        .method(
            MethodDescriptor::new("echo")
                .arg(arg::text("message"))
                .exit_code(123, "Always")
                .run(|mut call: Call| {
                    let message: String = call.take("message")?;
                    call.output().write_line(&message)?;
                    Ok(123)
                }),
        )
        .method(
            MethodDescriptor::new("echo2")
                .arg(arg::holder::<EchoArguments>("arguments"))
                .run(|mut call: Call| {
                    let arguments: EchoArguments = call.take("arguments")?;
                    call.output().write_line(&arguments.message)?;
                    Ok(())
                }),
        )
        .method(
            MethodDescriptor::new("sum")
                .arg(arg::custom_list::<i32>("numbers").keyless(0).required())
                .run(|mut call: Call| {
                    let numbers: Vec<i32> = call.take("numbers")?;
                    call.output().write_line(&numbers.iter().sum::<i32>().to_string())?;
                    Ok(())
                }),
        )
        .method(
            MethodDescriptor::new("sum2")
                .arg(arg::json_list::<i32>("numbers").parse_json())
                .run(|mut call: Call| {
                    let numbers: Vec<i32> = call.take("numbers")?;
                    Ok(numbers.iter().sum::<i32>())
                }),
        )
        .method(
            MethodDescriptor::new("float")
                .arg(arg::custom::<f32>("value"))
                .run(|mut call: Call| {
                    let value: f32 = call.take("value")?;
                    call.output().write_line(&value.to_string())?;
                    Ok(())
                }),
        )
        .method(MethodDescriptor::new("exit").run(|_| Ok(-123)))
        .method(MethodDescriptor::new("panic").run(|_| -> anyhow::Result<()> { panic!("kaboom") }))
        .build()
}

fn error_api() -> ApiDescriptor {
    ApiDescriptor::builder::<ErrorApi>("error")
        .method(
            MethodDescriptor::new("fail")
                .default_method()
                .run(|_| -> anyhow::Result<()> { Err(anyhow::anyhow!("Something went wrong")) }),
        )
        .build()
}

fn handling_api() -> ApiDescriptor {
    ApiDescriptor::builder::<HandlingApi>("handling")
        .error_handler()
        .method(
            MethodDescriptor::new("fail")
                .run(|_| -> anyhow::Result<()> { Err(anyhow::anyhow!("broken")) }),
        )
        .build()
}

fn app() -> (CliApp, OutputBuffer) {
    let (output, buffer) = Output::buffer();
    let apis = ApiSet::new(vec![demo_api(), error_api(), handling_api()]).unwrap();
    let config = CliConfig {
        command_line: Some("demo-cli".into()),
        color: false,
        ..CliConfig::default()
    };
    let app = CliApp::new(apis)
        .with_config(config)
        .with_output(output)
        .with_parser::<i32, _>(|_, _, raw| raw.parse().map_err(|e| format!("{e}")))
        .with_parser::<f32, _>(|_, _, raw| raw.parse().map_err(|e| format!("{e}")));
    (app, buffer)
}

async fn run(app: &CliApp, raw: &[&str]) -> i32 {
    app.run(raw, &CancellationToken::new()).await.unwrap()
}

#[tokio::test]
async fn test_echo_returns_command_exit_code() {
    let (app, buffer) = app();
    assert_eq!(run(&app, &["demo", "echo", "--message", "test"]).await, 123);
    assert_eq!(buffer.contents(), "test\n");
}

#[tokio::test]
async fn test_case_insensitive_names() {
    let (app, buffer) = app();
    assert_eq!(run(&app, &["DEMO", "Echo", "--MESSAGE", "test"]).await, 123);
    assert_eq!(buffer.contents(), "test\n");
}

#[tokio::test]
async fn test_argument_holder() {
    let (app, buffer) = app();
    assert_eq!(run(&app, &["demo", "echo2", "--message", "test"]).await, 0);
    assert_eq!(buffer.contents(), "test\n");
}

#[tokio::test]
async fn test_argument_holder_validation() {
    let (app, buffer) = app();
    assert_eq!(run(&app, &["demo", "echo2", "--message", ""]).await, 1);
    assert!(buffer
        .contents()
        .starts_with("Invalid arguments: [message] Message must not be empty"));
}

#[tokio::test]
async fn test_keyless_list() {
    let (app, buffer) = app();
    assert_eq!(run(&app, &["demo", "sum", "1", "2", "3"]).await, 0);
    assert_eq!(buffer.contents(), "6\n");
}

#[tokio::test]
async fn test_json_list() {
    let (app, _) = app();
    assert_eq!(run(&app, &["demo", "sum2", "--numbers", "1", "2", "3"]).await, 6);
}

#[tokio::test]
async fn test_negative_exit_code() {
    let (app, _) = app();
    assert_eq!(run(&app, &["demo", "exit"]).await, -123);
}

#[tokio::test]
async fn test_custom_parser() {
    let (app, buffer) = app();
    assert_eq!(run(&app, &["demo", "float", "--value", "0.123"]).await, 0);
    assert_eq!(buffer.contents(), "0.123\n");
}

#[tokio::test]
async fn test_parser_failure_names_argument() {
    let (app, buffer) = app();
    assert_eq!(run(&app, &["demo", "float", "--value", "abc"]).await, 1);
    assert!(buffer.contents().starts_with("Invalid arguments: [value]"));
}

#[tokio::test]
async fn test_missing_required_argument() {
    let (app, buffer) = app();
    assert_eq!(run(&app, &["demo", "echo"]).await, 1);

    let text = buffer.contents();
    assert!(text.starts_with("Invalid arguments: [message] Missing required argument"));
    assert!(text.contains("demo-cli demo echo --message MESSAGE"));
}

#[tokio::test]
async fn test_command_error_is_escalated_and_instance_disposed() {
    let (app, buffer) = app();
    let before = ERROR_API_DISPOSED.load(Ordering::SeqCst);

    assert_eq!(run(&app, &["error"]).await, 1);
    assert!(buffer
        .contents()
        .starts_with("An exception has been caught: Something went wrong"));
    assert_eq!(ERROR_API_DISPOSED.load(Ordering::SeqCst), before + 1);
}

#[tokio::test]
async fn test_error_handler_capability() {
    let (app, buffer) = app();
    assert_eq!(run(&app, &["handling", "fail"]).await, 42);
    assert_eq!(buffer.contents(), "handled: broken\n");
}

#[tokio::test]
async fn test_panic_is_captured() {
    let (app, buffer) = app();
    assert_eq!(run(&app, &["demo", "panic"]).await, 1);
    assert!(buffer
        .contents()
        .starts_with("An exception has been caught: Panic: kaboom"));
}

#[derive(Default)]
struct RecordingHelper {
    seen: Arc<Mutex<Vec<(Option<String>, bool)>>>,
}

impl Helper for RecordingHelper {
    fn display_help(&self, context: &CliApiContext) -> i32 {
        let error = context.error().map(|e| e.to_string());
        let exception = context.exception().is_some();
        self.seen.lock().unwrap().push((error, exception));
        7
    }
}

#[tokio::test]
async fn test_unknown_api_reaches_helper_without_exception() {
    let helper = RecordingHelper::default();
    let seen = Arc::clone(&helper.seen);
    let (app, _) = app();
    let app = app.with_helper(helper);

    assert_eq!(run(&app, &["nope"]).await, 7);
    let seen = seen.lock().unwrap();
    assert_eq!(seen.as_slice(), &[(Some("Unknown API \"nope\"".to_string()), false)]);
}

#[tokio::test]
async fn test_unknown_api_default_help() {
    let (app, buffer) = app();
    assert_eq!(run(&app, &["nope"]).await, 1);

    let text = buffer.contents();
    assert!(text.starts_with("Invalid arguments: Unknown API \"nope\""));
    assert!(text.contains("Available APIs:"));
    assert!(text.contains("Demo API"));
}

#[tokio::test]
async fn test_tokenize_error_is_escalated() {
    let (app, buffer) = app();
    assert_eq!(run(&app, &["demo", "echo", "--"]).await, 1);
    assert!(buffer.contents().starts_with("Invalid arguments:"));
}

#[tokio::test]
async fn test_single_api_and_method_shortcut() {
    let (output, buffer) = Output::buffer();
    let apis = ApiSet::new(vec![ApiDescriptor::builder::<DemoApi>("demo")
        .method(
            MethodDescriptor::new("sum")
                .arg(arg::custom_list::<i32>("numbers").keyless(0))
                .run(|mut call: Call| {
                    let numbers: Vec<i32> = call.take("numbers")?;
                    Ok(numbers.iter().sum::<i32>())
                }),
        )
        .build()])
    .unwrap();
    let app = CliApp::new(apis)
        .with_output(output)
        .with_parser::<i32, _>(|_, _, raw| raw.parse().map_err(|e| format!("{e}")));

    assert_eq!(run(&app, &["1", "2", "3"]).await, 6);
    assert_eq!(run(&app, &[]).await, 0);
    assert!(buffer.contents().is_empty());
}

#[tokio::test]
async fn test_help_api() {
    let (output, buffer) = Output::buffer();
    let apis = ApiSet::with_help_api(vec![demo_api()]).unwrap();
    let config = CliConfig {
        command_line: Some("demo-cli".into()),
        color: false,
        ..CliConfig::default()
    };
    let app = CliApp::new(apis).with_config(config).with_output(output);

    assert_eq!(run(&app, &["help"]).await, 1);
    assert!(buffer.contents().contains("Available APIs:"));
    buffer.clear();

    assert_eq!(run(&app, &["help", "--api", "demo", "--method", "echo"]).await, 1);
    let text = buffer.contents();
    assert!(text.starts_with("demo echo"));
    assert!(text.contains("demo-cli demo echo --message MESSAGE"));
    assert!(text.contains("123: Always"));
}

#[tokio::test]
async fn test_help_api_handles_unresolved_input() {
    let (output, buffer) = Output::buffer();
    let apis = ApiSet::with_help_api(vec![demo_api()]).unwrap();
    let app = CliApp::new(apis)
        .with_config(CliConfig {
            color: false,
            ..CliConfig::default()
        })
        .with_output(output);

    assert_eq!(run(&app, &["nope"]).await, 1);
    let text = buffer.contents();
    assert!(text.starts_with("Invalid arguments: Unknown API \"nope\""));
    assert!(text.contains("To display detailed help"));
}

#[tokio::test]
async fn test_cancelled_run() {
    let (app, buffer) = app();
    let token = CancellationToken::new();
    token.cancel();

    let result = app.run(&["demo", "exit"], &token).await;
    assert!(matches!(result, Err(CliError::Cancelled)));
    assert!(buffer.contents().is_empty());
}

#[tokio::test]
async fn test_unparseable_type_is_configuration_error() {
    let (output, _) = Output::buffer();
    let apis = ApiSet::new(vec![ApiDescriptor::builder::<OtherApi>("other")
        .method(
            MethodDescriptor::new("run")
                .arg(arg::custom::<u64>("value"))
                .run(|_| Ok(())),
        )
        .build()])
    .unwrap();
    let app = CliApp::new(apis).with_output(output);

    let result = app.run(&["--value", "1"], &CancellationToken::new()).await;
    assert!(matches!(result, Err(CliError::Configuration(_))));
}

#[derive(Default)]
struct AsyncApi {
    calls: usize,
}

impl CliApi for AsyncApi {}

impl AsyncApi {
    fn echo(&mut self, mut call: Call) -> BoxFuture<'_, anyhow::Result<i32>> {
        Box::pin(async move {
            self.calls += 1;
            let message: String = call.take("message")?;
            tokio::task::yield_now().await;
            call.output().write_line(&format!("{message} {}", self.calls))?;
            Ok(123)
        })
    }
}

fn async_app() -> (CliApp, OutputBuffer) {
    let (output, buffer) = Output::buffer();
    let api = ApiDescriptor::builder::<AsyncApi>("async")
        .method(
            MethodDescriptor::new("echo")
                .arg(arg::text("message"))
                .run_on_async(AsyncApi::echo),
        )
        .method(
            MethodDescriptor::new("sum2")
                .arg(arg::json_list::<i32>("numbers").parse_json())
                .run_async(|mut call: Call| async move {
                    let numbers: Vec<i32> = call.take("numbers")?;
                    tokio::task::yield_now().await;
                    Ok::<_, anyhow::Error>(numbers.iter().sum::<i32>())
                }),
        )
        .method(MethodDescriptor::new("exit").run_async(|_| async { Ok::<_, anyhow::Error>(-123) }))
        .method(MethodDescriptor::new("error").run_async(|_| async {
            tokio::task::yield_now().await;
            Err::<(), _>(anyhow::anyhow!("Async failure"))
        }))
        .build();
    let app = CliApp::new(ApiSet::new(vec![api, demo_api()]).unwrap())
        .with_config(CliConfig {
            color: false,
            ..CliConfig::default()
        })
        .with_output(output);
    (app, buffer)
}

#[tokio::test]
async fn test_async_echo_on_instance() {
    let (app, buffer) = async_app();
    assert_eq!(run(&app, &["async", "echo", "--message", "test"]).await, 123);
    assert_eq!(buffer.contents(), "test 1\n");
}

#[tokio::test]
async fn test_async_json_list() {
    let (app, _) = async_app();
    assert_eq!(run(&app, &["async", "sum2", "--numbers", "1", "2", "3"]).await, 6);
}

#[tokio::test]
async fn test_async_negative_exit_code() {
    let (app, _) = async_app();
    assert_eq!(run(&app, &["async", "exit"]).await, -123);
}

#[tokio::test]
async fn test_async_error_is_escalated() {
    let (app, buffer) = async_app();
    assert_eq!(run(&app, &["async", "error"]).await, 1);
    assert!(buffer
        .contents()
        .starts_with("An exception has been caught: Async failure"));
}

fn plain_api() -> ApiDescriptor {
    ApiDescriptor::builder::<OtherApi>("plain")
        .method(
            MethodDescriptor::new("exit")
                .plain("exit_code", 213i32)
                .run(|mut call: Call| {
                    if !call.names().any(|name| name == "exit_code") {
                        return Ok(7);
                    }
                    let code: i32 = call.take("exit_code")?;
                    Ok(code)
                }),
        )
        .method(MethodDescriptor::new("other").run(|_| Ok(())))
        .build()
}

#[tokio::test]
async fn test_plain_parameter_receives_its_value() {
    let (output, _) = Output::buffer();
    let app = CliApp::new(ApiSet::new(vec![plain_api()]).unwrap()).with_output(output);
    assert_eq!(run(&app, &["exit"]).await, 213);
}

#[tokio::test]
async fn test_plain_parameter_omitted_under_invoke_auto() {
    let (output, _) = Output::buffer();
    let app = CliApp::new(ApiSet::new(vec![plain_api()]).unwrap())
        .with_config(CliConfig {
            invoke_auto: true,
            ..CliConfig::default()
        })
        .with_output(output);
    assert_eq!(run(&app, &["exit"]).await, 7);
}

#[derive(Default)]
struct FileApi {
    path: String,
}

impl CliApi for FileApi {}

impl FileApi {
    fn len(&mut self, _call: Call) -> anyhow::Result<i32> {
        Ok(self.path.len() as i32)
    }
}

#[derive(Default)]
struct HelpfulApi;

impl CliApi for HelpfulApi {}

impl HelpProvider for HelpfulApi {
    fn display_help(&mut self, context: &CliApiContext) -> i32 {
        let error = context.error().map(|e| e.to_string()).unwrap_or_default();
        let _ = context.output().write_line(&format!("helpful: {error}"));
        55
    }
}

fn property_app() -> (CliApp, OutputBuffer) {
    let (output, buffer) = Output::buffer();
    let file = ApiDescriptor::builder::<FileApi>("file")
        .property(arg::text("path").keyless(0), |api: &mut FileApi, path| api.path = path)
        .method(MethodDescriptor::new("len").run_on(FileApi::len))
        .method(MethodDescriptor::new("stat").run_on(|_: &mut FileApi, _| Ok(0)))
        .build();
    let helpful = ApiDescriptor::builder::<HelpfulApi>("helpful")
        .help_provider()
        .method(
            MethodDescriptor::new("go")
                .arg(arg::text("target").required())
                .run(|_| Ok(())),
        )
        .method(MethodDescriptor::new("stay").run(|_| Ok(())))
        .build();
    let app = CliApp::new(ApiSet::new(vec![file, helpful, demo_api()]).unwrap())
        .with_config(CliConfig {
            color: false,
            ..CliConfig::default()
        })
        .with_output(output);
    (app, buffer)
}

#[tokio::test]
async fn test_keyless_api_property_precedes_method_name() {
    let (app, _) = property_app();
    assert_eq!(run(&app, &["file", "abc", "len"]).await, 3);
    assert_eq!(run(&app, &["file", "abcde", "len"]).await, 5);
}

#[tokio::test]
async fn test_api_help_provider_handles_binding_error() {
    let (app, buffer) = property_app();
    assert_eq!(run(&app, &["helpful", "go"]).await, 55);
    assert!(buffer.contents().starts_with("helpful: [target] Missing required argument"));
}

fn info_app(info: Option<AppInfo>) -> (CliApp, OutputBuffer) {
    let (output, buffer) = Output::buffer();
    let apis = ApiSet::with_help_api(vec![demo_api(), version_api(), about_api()]).unwrap();
    let app = CliApp::new(apis)
        .with_config(CliConfig {
            command_line: Some("demo-cli".into()),
            color: false,
            ..CliConfig::default()
        })
        .with_output(output);
    let app = match info {
        Some(info) => app.with_service(info),
        None => app,
    };
    (app, buffer)
}

fn build_label() -> &'static str {
    if cfg!(debug_assertions) {
        "Debug build"
    } else {
        "Release build"
    }
}

#[tokio::test]
async fn test_version_api() {
    let (app, buffer) = info_app(Some(AppInfo::new("Demo CLI", "2.1.0")));
    assert_eq!(run(&app, &["version"]).await, 0);
    assert_eq!(buffer.contents(), "Demo CLI version 2.1.0\n");
    buffer.clear();

    assert_eq!(run(&app, &["VERSION", "display"]).await, 0);
    assert_eq!(buffer.contents(), "Demo CLI version 2.1.0\n");
}

#[tokio::test]
async fn test_version_api_without_app_info() {
    let (app, buffer) = info_app(None);
    assert_eq!(run(&app, &["version"]).await, 0);
    assert_eq!(buffer.contents(), "demo-cli version 1.0.0\n");
}

#[tokio::test]
async fn test_about_api() {
    let info = AppInfo::new("Demo CLI", "2.1.0").with_info("Tools for the demo API");
    let (app, buffer) = info_app(Some(info));

    assert_eq!(run(&app, &["about"]).await, 0);
    assert_eq!(
        buffer.contents(),
        format!("Demo CLI version 2.1.0 ({})\n\nTools for the demo API\n", build_label())
    );
    buffer.clear();

    assert_eq!(run(&app, &["about", "version"]).await, 0);
    assert_eq!(buffer.contents(), format!("Demo CLI version 2.1.0 ({})\n", build_label()));
}

#[tokio::test]
async fn test_help_lists_version_and_about() {
    let (app, buffer) = info_app(None);
    assert_eq!(run(&app, &["help"]).await, 1);
    let text = buffer.contents();
    assert!(text.contains("version"));
    assert!(text.contains("about"));
}
