use std::path::PathBuf;

use clap::Parser;

use crate::config::DashboardConfig;
use crate::data::loader::Source;

/// Command-line arguments for agri-dash
#[derive(Parser, Debug)]
#[command(version, about = "Explore the agricultural employment dataset")]
pub struct Args {
    /// Local dataset to open (.csv, .json or .parquet) instead of the remote CSV
    pub path: Option<PathBuf>,

    /// Fetch the dataset from this URL instead of the configured one
    #[arg(long = "url", conflicts_with = "path")]
    pub url: Option<String>,

    /// JSON configuration file
    #[arg(long = "config")]
    pub config: Option<PathBuf>,
}

impl Args {
    /// The source to load: a local path, an explicit URL, or the configured URL.
    pub fn source(&self, config: &DashboardConfig) -> Source {
        match (&self.path, &self.url) {
            (Some(path), _) => Source::File(path.clone()),
            (None, Some(url)) => Source::Url(url.clone()),
            (None, None) => Source::Url(config.source_url.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_configured_url() {
        let args = Args::parse_from(["agri-dash"]);
        let config = DashboardConfig::default();
        assert_eq!(args.source(&config), Source::Url(config.source_url.clone()));
    }

    #[test]
    fn path_and_url_are_exclusive() {
        assert!(Args::try_parse_from(["agri-dash", "data.csv", "--url", "http://x/y.csv"]).is_err());
        let args = Args::parse_from(["agri-dash", "data.csv"]);
        assert_eq!(
            args.source(&DashboardConfig::default()),
            Source::File(PathBuf::from("data.csv"))
        );
    }
}
