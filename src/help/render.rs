//! Usage syntax and help text rendering

use crate::config::CliConfig;
use crate::dispatch::CliApiContext;
use crate::error::DispatchError;
use crate::metadata::{ApiDescriptor, ApiSet, ArgumentDescriptor, ArgumentKind, MethodDescriptor};
#[cfg(feature = "help")]
use colored::Colorize;
use std::fmt::Write as _;

#[derive(Clone, Copy)]
enum Paint {
    Api,
    Method,
    Required,
    Optional,
    Heading,
    Error,
}

#[cfg(feature = "help")]
fn paint(text: &str, config: &CliConfig, paint: Paint) -> String {
    if !config.use_color() {
        return text.to_string();
    }
    match paint {
        Paint::Api => text.cyan().bold().to_string(),
        Paint::Method => text.green().to_string(),
        Paint::Required => text.yellow().to_string(),
        Paint::Optional => text.dimmed().to_string(),
        Paint::Heading => text.bold().to_string(),
        Paint::Error => text.white().on_red().to_string(),
    }
}

#[cfg(not(feature = "help"))]
fn paint(text: &str, _config: &CliConfig, _paint: Paint) -> String {
    text.to_string()
}

#[cfg(feature = "help")]
fn table(header: &[&str], rows: Vec<Vec<String>>) -> String {
    let mut table = comfy_table::Table::new();
    table.load_preset(comfy_table::presets::NOTHING);
    table.set_header(header.to_vec());
    for row in rows {
        table.add_row(row);
    }
    table.to_string()
}

#[cfg(not(feature = "help"))]
fn table(header: &[&str], rows: Vec<Vec<String>>) -> String {
    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (index, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(index) {
                *width = (*width).max(cell.chars().count());
            }
        }
    }
    let header: Vec<String> = header.iter().map(|h| h.to_string()).collect();
    std::iter::once(header)
        .chain(rows)
        .map(|row| {
            row.iter()
                .zip(&widths)
                .map(|(cell, width)| format!("{cell:<width$}"))
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Type name with module paths stripped, e.g. `Vec<i32>`
pub fn short_type_name(name: &str) -> String {
    let mut out = String::new();
    let mut segment = String::new();
    for c in name.chars() {
        if matches!(c, '<' | '>' | ',' | ' ' | '(' | ')' | '[' | ']' | ';' | '&') {
            out.push_str(last_path_segment(&segment));
            segment.clear();
            out.push(c);
        } else {
            segment.push(c);
        }
    }
    out.push_str(last_path_segment(&segment));
    out
}

fn last_path_segment(path: &str) -> &str {
    path.rsplit("::").next().unwrap_or(path)
}

fn type_label(argument: &ArgumentDescriptor) -> String {
    let name = match argument.kind() {
        ArgumentKind::Flag => return "flag".to_string(),
        _ => short_type_name(argument.value_type().name()),
    };
    if argument.is_array() {
        format!("{name}[]")
    } else {
        name
    }
}

fn placeholder(argument: &ArgumentDescriptor) -> String {
    if let Some(example) = argument.example() {
        return example.to_string();
    }
    if argument.can_json_parse() && argument.is_complex() {
        format!("{}Json", argument.name())
    } else {
        argument.name().to_uppercase()
    }
}

/// Usage syntax of one argument.
///
/// Flags render as `(-name)`, named values as `--name VALUE`, keyless
/// values as `VALUE`. Lists append `...`, optional arguments are
/// parenthesized.
///
/// ```
/// use cliapi::prelude::*;
/// use cliapi::help::argument_usage;
///
/// let message = arg::text("message").into_descriptor();
/// assert_eq!(argument_usage(&message), "--message MESSAGE");
///
/// let verbose = arg::flag("verbose").into_descriptor();
/// assert_eq!(argument_usage(&verbose), "(-verbose)");
/// ```
pub fn argument_usage(argument: &ArgumentDescriptor) -> String {
    let usage = match argument.kind() {
        ArgumentKind::Flag => format!("-{}", argument.name()),
        _ if argument.is_keyless() => placeholder(argument),
        _ => format!("--{} {}", argument.name(), placeholder(argument)),
    };
    let usage = if argument.is_array() { format!("{usage} ...") } else { usage };
    if argument.kind() == ArgumentKind::Flag || !argument.is_required() {
        format!("({usage})")
    } else {
        usage
    }
}

/// Bindable arguments of an API method in usage order.
///
/// Required named arguments come first, then flags, then optional named
/// arguments, each sorted by name. Keyless arguments close the list in
/// binding order.
pub fn ordered_arguments<'a>(api: &'a ApiDescriptor, method: &'a MethodDescriptor) -> Vec<&'a ArgumentDescriptor> {
    let mut required = Vec::new();
    let mut flags = Vec::new();
    let mut optional = Vec::new();
    let mut keyless = Vec::new();

    for (owner, arguments) in [(0, api.flatten()), (1, method.flatten())] {
        for argument in arguments {
            if argument.is_holder() {
                continue;
            }
            if let Some(offset) = argument.keyless_offset() {
                keyless.push((owner, offset, argument));
            } else if argument.kind() == ArgumentKind::Flag {
                flags.push(argument);
            } else if argument.is_required() {
                required.push(argument);
            } else {
                optional.push(argument);
            }
        }
    }

    for group in [&mut required, &mut flags, &mut optional] {
        group.sort_by_key(|argument| argument.name().to_lowercase());
    }
    keyless.sort_by_key(|(owner, offset, _)| (*owner, *offset));

    required
        .into_iter()
        .chain(flags)
        .chain(optional)
        .chain(keyless.into_iter().map(|(_, _, argument)| argument))
        .collect()
}

/// Full usage line of an API method.
///
/// The API name is left out when only one API is exported, the method
/// name when additionally the API has only one method.
pub fn method_usage(apis: &ApiSet, api: &ApiDescriptor, method: &MethodDescriptor, config: &CliConfig) -> String {
    let mut parts = vec![config.command_line()];
    if apis.len() > 1 {
        parts.push(paint(api.name(), config, Paint::Api));
    }
    if apis.len() > 1 || api.methods().len() > 1 {
        parts.push(paint(method.name(), config, Paint::Method));
    }
    for argument in ordered_arguments(api, method) {
        let usage = argument_usage(argument);
        let style = if argument.is_required() { Paint::Required } else { Paint::Optional };
        parts.push(paint(&usage, config, style));
    }
    parts.join(" ")
}

fn header(out: &mut String, config: &CliConfig) {
    if let Some(header) = &config.help_header {
        let _ = writeln!(out, "{}\n", paint(header, config, Paint::Heading));
    }
}

fn title_line(out: &mut String, name: String, title: Option<&str>, description: Option<&str>) {
    match title {
        Some(title) => {
            let _ = writeln!(out, "{name}: {title}");
        }
        None => {
            let _ = writeln!(out, "{name}");
        }
    }
    if let Some(description) = description {
        let _ = writeln!(out, "{description}");
    }
    out.push('\n');
}

/// Overview of all exported APIs
pub fn general_help(apis: &ApiSet, config: &CliConfig) -> String {
    let mut out = String::new();
    let command = config.command_line();
    let _ = writeln!(out, "{}\n", paint("General usage:", config, Paint::Heading));
    let _ = writeln!(out, "\t{command} API (Method) (Arguments)\n");
    let _ = writeln!(out, "{}\n", paint("Available APIs:", config, Paint::Heading));

    let rows = apis
        .iter()
        .map(|api| {
            vec![
                api.name().to_string(),
                api.title().unwrap_or_default().to_string(),
                api.description().unwrap_or_default().to_string(),
            ]
        })
        .collect();
    let _ = writeln!(out, "{}\n", table(&["API", "Title", "Description"], rows));

    if let Some(help) = apis.help_api() {
        let _ = writeln!(out, "To display detailed help for an API or an API method:\n");
        let _ = writeln!(out, "\t{command} {} --api API (--method Method) (-details)", help.name());
    }
    out
}

/// Help for one API: its methods and their usage lines
pub fn api_help(apis: &ApiSet, api: &ApiDescriptor, config: &CliConfig, details: bool) -> String {
    let mut out = String::new();
    title_line(&mut out, paint(api.name(), config, Paint::Api), api.title(), api.description());
    let _ = writeln!(out, "{}\n", paint("Available API methods:", config, Paint::Heading));

    for method in api.methods() {
        let _ = writeln!(out, "\t{}", method_usage(apis, api, method, config));
        if let Some(title) = method.title_text() {
            let _ = writeln!(out, "\t{title}");
        }
        if let Some(description) = method.description_text() {
            let _ = writeln!(out, "\t{description}");
        }
        out.push('\n');
        if details {
            let arguments = ordered_arguments(api, method);
            if !arguments.is_empty() {
                let _ = writeln!(out, "{}\n", argument_table(&arguments));
            }
        }
    }

    if let Some(help) = apis.help_api() {
        let _ = writeln!(out, "To display detailed help for an API method:\n");
        let _ = writeln!(
            out,
            "\t{} {} --api {} --method Method",
            config.command_line(),
            help.name(),
            api.name()
        );
    }
    out
}

fn argument_table(arguments: &[&ArgumentDescriptor]) -> String {
    let rows = arguments
        .iter()
        .map(|argument| {
            let summary = match (argument.title(), argument.description()) {
                (Some(title), Some(description)) => format!("{title}. {description}"),
                (Some(text), None) | (None, Some(text)) => text.to_string(),
                (None, None) => String::new(),
            };
            vec![
                argument_usage(argument),
                type_label(argument),
                if argument.is_required() { "Required" } else { "Optional" }.to_string(),
                summary,
            ]
        })
        .collect();
    table(&["Argument", "Type", "", "Description"], rows)
}

/// Help for one API method: usage, arguments, exit codes and streams
pub fn method_help(apis: &ApiSet, api: &ApiDescriptor, method: &MethodDescriptor, config: &CliConfig) -> String {
    let mut out = String::new();
    let name = format!(
        "{} {}",
        paint(api.name(), config, Paint::Api),
        paint(method.name(), config, Paint::Method)
    );
    title_line(&mut out, name, method.title_text(), method.description_text());
    let _ = writeln!(out, "{}\n", paint("General usage:", config, Paint::Heading));
    let _ = writeln!(out, "\t{}\n", method_usage(apis, api, method, config));

    let arguments = ordered_arguments(api, method);
    if !arguments.is_empty() {
        let _ = writeln!(out, "{}\n", paint("Available method arguments:", config, Paint::Heading));
        let _ = writeln!(out, "{}\n", argument_table(&arguments));
    }

    if !method.exit_codes().is_empty() {
        let _ = writeln!(out, "{}\n", paint("Used exit codes:", config, Paint::Heading));
        for (code, description) in method.exit_codes() {
            let _ = writeln!(out, "\t{}: {description}", paint(&code.to_string(), config, Paint::Required));
        }
        out.push('\n');
    }

    let streams = [
        ("STDIN", method.stdin_usage()),
        ("STDOUT", method.stdout_usage()),
        ("STDERR", method.stderr_usage()),
    ];
    for (stream, usage) in streams {
        if let Some(usage) = usage {
            let requirement = if usage.required { "Required" } else { "Optional" };
            let _ = writeln!(out, "{stream} ({requirement}): {}", usage.description);
        }
    }
    out
}

/// Help requested through the help API.
///
/// Unknown names are reported and the next broader help is shown.
pub fn requested_help(
    apis: &ApiSet,
    config: &CliConfig,
    api: Option<&str>,
    method: Option<&str>,
    details: bool,
) -> String {
    let mut out = String::new();
    header(&mut out, config);

    let Some(api_name) = api else {
        out.push_str(&general_help(apis, config));
        return out;
    };
    let Some(api) = apis.get(api_name) else {
        let _ = writeln!(out, "{}\n", paint(&format!("API not found: \"{api_name}\""), config, Paint::Error));
        out.push_str(&general_help(apis, config));
        return out;
    };
    match method.map(|name| (name, api.method(name))) {
        None => out.push_str(&api_help(apis, api, config, details)),
        Some((_, Some(method))) => out.push_str(&method_help(apis, api, method, config)),
        Some((name, None)) => {
            let _ = writeln!(out, "{}\n", paint(&format!("API method not found: \"{name}\""), config, Paint::Error));
            out.push_str(&api_help(apis, api, config, details));
        }
    }
    out
}

fn error_line(error: &DispatchError, config: &CliConfig) -> String {
    let message = match error {
        DispatchError::Invocation(error) if config.full_errors => {
            format!("An exception has been caught: {error:?}")
        }
        DispatchError::Invocation(error) => format!("An exception has been caught: {error:#}"),
        other => format!("Invalid arguments: {other}"),
    };
    paint(&message, config, Paint::Error)
}

/// Help for a failed or unidentifiable dispatch run.
///
/// Shows the captured failure first, then the most specific help the
/// context allows.
pub fn context_help(context: &CliApiContext) -> String {
    let config = context.config();
    let apis = context.exported();
    let mut out = String::new();
    if !context.has_parameters() || context.exception().is_none() {
        header(&mut out, config);
    }
    if let Some(error) = context.error() {
        let _ = writeln!(out, "{}\n", error_line(error, config));
    }
    match (context.api(), context.method()) {
        (Some(api), Some(method)) => out.push_str(&method_help(apis, api, method, config)),
        (Some(api), None) => out.push_str(&api_help(apis, api, config, false)),
        _ => out.push_str(&general_help(apis, config)),
    }
    out
}
