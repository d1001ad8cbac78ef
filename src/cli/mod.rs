//! Command-line interface definitions for the `symsend` binary.
//!
//! This module centralises the clap parser structure so both the main binary
//! and the build script can reuse it when generating the manual page.

use clap::Parser;

/// Command-line arguments for the `symsend` binary.
///
/// Token and API key may come from flags or from a configuration file; flags
/// win when both are present. The search path falls back to the
/// `DWARF_DSYM_FOLDER_PATH` environment variable Xcode exports during builds.
#[derive(Debug, Parser)]
#[command(
    name = "symsend",
    about = "Upload iOS dSYM bundles to Flurry's crash symbolication service",
    long_about = "Upload dSYM files for use in Flurry's crash reporting.\n\
                  You must specify either token and api-key or a configuration file."
)]
pub(crate) struct Cli {
    /// A programmatic token used to authenticate against the APIs.
    #[arg(short = 't', long, value_name = "TOKEN")]
    pub(crate) token: Option<String>,
    /// API key of the project the symbols belong to.
    #[arg(short = 'k', long, value_name = "KEY")]
    pub(crate) api_key: Option<String>,
    /// A TOML file that has your API key and token under a `[flurry]` section.
    #[arg(short = 'c', long, value_name = "PATH")]
    pub(crate) config_file: Option<String>,
    /// The path where Xcode generates dSYMs: a single bundle, a directory of
    /// bundles, or a zip archive downloaded from App Store Connect.
    #[arg(
        short = 'p',
        long,
        visible_alias = "dsyms-root",
        short_alias = 'f',
        env = "DWARF_DSYM_FOLDER_PATH",
        value_name = "PATH"
    )]
    pub(crate) search_path: Option<String>,
    /// Log filter directives, e.g. `info` or `symsend=debug`.
    #[arg(long, value_name = "LEVEL", default_value = "info")]
    pub(crate) log: String,
    /// Skip TLS certificate verification when talking to the APIs.
    #[arg(long)]
    pub(crate) insecure: bool,
    /// Do not wait for the upload to be processed server-side.
    #[arg(long)]
    pub(crate) no_wait: bool,
    /// The maximum number of seconds to wait for the upload to get processed
    /// before failing.
    #[arg(long, value_name = "SECONDS", default_value_t = 600)]
    pub(crate) max_wait: u64,
}
