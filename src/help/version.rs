//! The built-in version API and the application identity it shows

use crate::dispatch::Call;
use crate::metadata::{ApiDescriptor, CliApi, MethodDescriptor};

/// Application identity shown by the `version` and `about` APIs.
///
/// Register it as a service on the app. Without one, the command line
/// name and version `1.0.0` are shown.
///
/// ```
/// use cliapi::help::AppInfo;
///
/// let info = AppInfo::new(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")).with_info("Demo tooling");
/// assert_eq!(info.info.as_deref(), Some("Demo tooling"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppInfo {
    /// Application title
    pub title: String,
    /// Application version
    pub version: String,
    /// Additional text for `about info`
    pub info: Option<String>,
}

impl AppInfo {
    /// Title and version without additional text
    pub fn new(title: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            version: version.into(),
            info: None,
        }
    }

    /// Set the additional text
    pub fn with_info(mut self, info: impl Into<String>) -> Self {
        self.info = Some(info.into());
        self
    }

    pub(crate) fn of(call: &Call) -> Self {
        match call.service::<AppInfo>() {
            Some(info) => info.as_ref().clone(),
            None => Self::new(call.config().command_line(), "1.0.0"),
        }
    }

    pub(crate) fn version_line(&self) -> String {
        format!("{} version {}", self.title, self.version)
    }
}

/// Prints `<title> version <version>`
#[derive(Debug, Default)]
pub struct VersionApi;

impl CliApi for VersionApi {}

impl VersionApi {
    fn display(&mut self, call: Call) -> anyhow::Result<()> {
        call.output().write_line(&AppInfo::of(&call).version_line())?;
        Ok(())
    }
}

/// Declaration of [`VersionApi`], named `version`
pub fn version_api() -> ApiDescriptor {
    ApiDescriptor::builder::<VersionApi>("version")
        .title("Version")
        .description("Display the app version")
        .method(
            MethodDescriptor::new("display")
                .default_method()
                .title("Display")
                .description("Display the app version")
                .stdout("Version line")
                .run_on(VersionApi::display),
        )
        .build()
}
