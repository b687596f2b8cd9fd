//! Command-line arguments.

use std::path::PathBuf;
use std::str::FromStr;

use clap::Parser;
use pixelpost_core::ImageFormat;

/// Convert one image into several encoded variants and upload them concurrently.
#[derive(Debug, Parser)]
#[command(name = "pixelpost", version, about)]
pub struct Cli {
    /// Source image to convert
    pub image: PathBuf,

    /// Variant to produce, as FORMAT:QUALITY[:KEY_PREFIX] (repeatable)
    #[arg(long = "variant", default_value = "jpeg:100")]
    pub variants: Vec<Variant>,

    /// Prefix prepended to every object key
    #[arg(long, short, default_value = "")]
    pub prefix: String,

    /// Path to a TOML configuration file
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Store objects under this directory instead of the configured store
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Bucket name, overriding the configured one
    #[arg(long)]
    pub bucket: Option<String>,

    /// Accept the source image's own size instead of the configured dimensions
    #[arg(long)]
    pub use_image_size: bool,

    /// Enable verbose logging
    #[arg(long, short)]
    pub verbose: bool,
}

/// One requested output variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    pub format: ImageFormat,
    pub quality: u8,
    pub key_prefix: String,
}

impl FromStr for Variant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');
        let format = parts
            .next()
            .filter(|f| !f.is_empty())
            .ok_or_else(|| format!("missing format in '{s}'"))?
            .parse::<ImageFormat>()
            .map_err(|e| e.to_string())?;
        let quality = parts
            .next()
            .ok_or_else(|| format!("missing quality in '{s}', expected FORMAT:QUALITY"))?
            .parse::<u8>()
            .map_err(|e| format!("invalid quality in '{s}': {e}"))?;
        let key_prefix = parts.next().unwrap_or_default().to_string();

        Ok(Self {
            format,
            quality,
            key_prefix,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_parse() {
        assert_eq!(
            "jpeg:100".parse::<Variant>(),
            Ok(Variant {
                format: ImageFormat::Jpeg,
                quality: 100,
                key_prefix: String::new(),
            })
        );
        assert_eq!(
            ".png:80:thumbs/".parse::<Variant>(),
            Ok(Variant {
                format: ImageFormat::Png,
                quality: 80,
                key_prefix: "thumbs/".to_string(),
            })
        );
    }

    #[test]
    fn test_variant_parse_errors() {
        assert!("jpeg".parse::<Variant>().is_err());
        assert!(":90".parse::<Variant>().is_err());
        assert!("gif:90".parse::<Variant>().is_err());
        assert!("jpeg:300".parse::<Variant>().is_err());
    }

    #[test]
    fn test_cli_parse() {
        let cli = Cli::try_parse_from([
            "pixelpost",
            "test.png",
            "--variant",
            "jpeg:100",
            "--variant",
            "webp:50",
            "--prefix",
            "asdf",
        ])
        .unwrap();

        assert_eq!(cli.image, PathBuf::from("test.png"));
        assert_eq!(cli.variants.len(), 2);
        assert_eq!(cli.variants[1].format, ImageFormat::WebP);
        assert_eq!(cli.prefix, "asdf");
        assert!(!cli.verbose);
    }

    #[test]
    fn test_cli_default_variant() {
        let cli = Cli::try_parse_from(["pixelpost", "test.png"]).unwrap();
        assert_eq!(cli.variants, vec!["jpeg:100".parse::<Variant>().unwrap()]);
    }
}
