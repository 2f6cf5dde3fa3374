use clap::Parser;
use std::str::FromStr;

/// Command-line arguments for the interactive annotation session.
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Directory containing the images to annotate
    #[arg(short = 'd', long = "image_dir")]
    pub image_dir: String,

    /// Seed for the train/val/test shuffle at export time
    #[arg(long = "seed", default_value_t = 42)]
    pub seed: u64,

    /// Color tolerance for the built-in region-growing mask backend
    #[arg(long = "tolerance", default_value_t = 24.0, value_parser = validate_tolerance)]
    pub tolerance: f64,
}

// Validate that the tolerance is a sane per-channel color distance
fn validate_tolerance(s: &str) -> Result<f64, String> {
    match f64::from_str(s) {
        Ok(val) if (0.0..=441.7).contains(&val) => Ok(val),
        _ => Err("TOLERANCE must be between 0.0 and 441.7".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_tolerance() {
        assert!(validate_tolerance("24.0").is_ok());
        assert!(validate_tolerance("0.0").is_ok());
        assert!(validate_tolerance("-1.0").is_err());
        assert!(validate_tolerance("500").is_err());
        assert!(validate_tolerance("abc").is_err());
    }
}
