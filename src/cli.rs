use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::state::Page;

/// Page to open on start.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum StartPage {
    /// Synthetic sales data with table and chart views
    Sales,
    /// Repeated fruit sample with bar and pie charts
    Practice,
    /// Student analysis dashboard with filters
    Students,
    /// Data-entry form for new student records
    Form,
}

impl From<StartPage> for Page {
    fn from(page: StartPage) -> Self {
        match page {
            StartPage::Sales => Page::Sales,
            StartPage::Practice => Page::Practice,
            StartPage::Students => Page::Students,
            StartPage::Form => Page::StudentForm,
        }
    }
}

/// Command-line arguments for rusty-dashboard
#[derive(Parser, Debug)]
#[command(version, about = "Interactive dashboard for small SQLite-backed datasets")]
pub struct Args {
    /// Read settings from this TOML file instead of searching for one
    #[arg(long = "config")]
    pub config: Option<PathBuf>,

    /// Directory holding the SQLite files (overrides the config file)
    #[arg(long = "data-dir")]
    pub data_dir: Option<PathBuf>,

    /// Seed for the synthetic sales data (overrides the config file)
    #[arg(long = "seed")]
    pub seed: Option<u64>,

    #[arg(long = "page", value_enum, default_value_t = StartPage::Sales)]
    pub page: StartPage,

    /// Print the effective configuration as TOML and exit
    #[arg(long = "print-config", action)]
    pub print_config: bool,
}
