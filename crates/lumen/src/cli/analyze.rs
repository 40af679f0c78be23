//! The `lumen analyze` command.

use clap::{Args, ValueEnum};
use lumen_core::{AnalyzeRequest, Config, Lumen, ResponseFormat};

/// Arguments for the `analyze` command.
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Image to analyze: local path, http(s) URL, or data:image/...;base64 URL
    #[arg(required = true)]
    pub image: String,

    /// What to ask about the image
    #[arg(required = true)]
    pub prompt: String,

    /// Requested answer format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Prompt template (general, ocr, ui, chart, code); chosen from the prompt if omitted
    #[arg(short, long)]
    pub template: Option<String>,

    /// Provider id, overriding config and LUMEN_PROVIDER
    #[arg(long)]
    pub provider: Option<String>,

    /// Model name, overriding config and LUMEN_MODEL
    #[arg(long)]
    pub model: Option<String>,

    /// Print only the answer text instead of the JSON envelope
    #[arg(long)]
    pub content_only: bool,
}

/// Supported answer formats.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    /// Free-form text
    Text,
    /// Ask the model for a JSON object
    Json,
}

impl From<OutputFormat> for ResponseFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Text => ResponseFormat::Text,
            OutputFormat::Json => ResponseFormat::Json,
        }
    }
}

fn apply_overrides(config: &mut Config, args: &AnalyzeArgs, verbose: bool) {
    if let Some(provider) = &args.provider {
        config.provider.name = provider.trim().to_lowercase();
    }
    if let Some(model) = &args.model {
        config.provider.model = Some(model.clone());
    }
    if verbose && !config.logging.is_debug() {
        config.logging.level = "debug".to_string();
    }
}

/// Execute the analyze command.
///
/// Analysis failures are printed as a sanitized error envelope and exit with
/// status 1; startup misconfiguration is returned as an error.
pub async fn execute(args: AnalyzeArgs, mut config: Config, verbose: bool) -> anyhow::Result<()> {
    apply_overrides(&mut config, &args, verbose);
    let lumen = Lumen::new(config)?;

    let mut request = AnalyzeRequest::new(args.image, args.prompt).with_format(args.format.into());
    if let Some(template) = args.template {
        request = request.with_template(template);
    }

    let response = lumen.handle_analyze(&request).await;
    match (&response.result, args.content_only) {
        (Some(result), true) => println!("{}", result.content),
        _ => super::print_json(&response)?,
    }

    if response.is_error {
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(provider: Option<&str>, model: Option<&str>) -> AnalyzeArgs {
        AnalyzeArgs {
            image: "cat.png".to_string(),
            prompt: "describe".to_string(),
            format: OutputFormat::Text,
            template: None,
            provider: provider.map(str::to_string),
            model: model.map(str::to_string),
            content_only: false,
        }
    }

    #[test]
    fn test_overrides_replace_config() {
        let mut config = Config::default();
        apply_overrides(&mut config, &args(Some(" Google "), Some("gemini-2.0-flash")), false);
        assert_eq!(config.provider.name, "google");
        assert_eq!(config.provider.model.as_deref(), Some("gemini-2.0-flash"));
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_verbose_enables_debug_errors() {
        let mut config = Config::default();
        apply_overrides(&mut config, &args(None, None), true);
        assert!(config.logging.is_debug());
        assert_eq!(config.provider.name, "openai");
    }

    #[test]
    fn test_format_conversion() {
        assert_eq!(ResponseFormat::from(OutputFormat::Json), ResponseFormat::Json);
    }
}
