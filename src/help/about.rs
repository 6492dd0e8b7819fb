//! The built-in about API

use super::version::AppInfo;
use crate::dispatch::Call;
use crate::metadata::{ApiDescriptor, CliApi, MethodDescriptor};

/// Prints the application identity, optionally followed by the
/// [`AppInfo::info`] text
#[derive(Debug, Default)]
pub struct AboutApi;

impl CliApi for AboutApi {}

fn build_label() -> &'static str {
    if cfg!(debug_assertions) {
        "Debug build"
    } else {
        "Release build"
    }
}

impl AboutApi {
    fn info(&mut self, call: Call) -> anyhow::Result<()> {
        let info = AppInfo::of(&call);
        call.output().write_line(&format!("{} ({})", info.version_line(), build_label()))?;
        if let Some(text) = &info.info {
            call.output().write_str(&format!("\n{text}\n"))?;
        }
        Ok(())
    }

    fn version(&mut self, call: Call) -> anyhow::Result<()> {
        let info = AppInfo::of(&call);
        call.output().write_line(&format!("{} ({})", info.version_line(), build_label()))?;
        Ok(())
    }
}

/// Declaration of [`AboutApi`], named `about`
pub fn about_api() -> ApiDescriptor {
    ApiDescriptor::builder::<AboutApi>("about")
        .title("About")
        .description("Display information about this CLI app")
        .method(
            MethodDescriptor::new("info")
                .default_method()
                .title("Information")
                .description("Display detailed app information")
                .stdout("Version line and app information")
                .run_on(AboutApi::info),
        )
        .method(
            MethodDescriptor::new("version")
                .title("Version")
                .description("Display app version information")
                .stdout("Version line with the build profile")
                .run_on(AboutApi::version),
        )
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_about_api_declaration() {
        let api = about_api();
        assert_eq!(api.default_method().map(|m| m.name()), Some("info"));
        assert!(api.method("VERSION").is_some());
        assert_eq!(api.methods().len(), 2);
    }
}
