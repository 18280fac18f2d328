use clap::Parser;

/// Recomputes assembly ballot results from an exported artifact and checks
/// them against a published reference.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path) The result artifact to audit, in JSON format. It carries the
    /// ballot description and every canonical vote string cast.
    #[clap(short, long, value_parser)]
    pub artifact: String,

    /// (file path) A reference result in JSON format. If provided, asmtally will
    /// check that the recomputed result matches the reference byte for byte.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the recomputed result will be
    /// written in JSON format to the given location.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// Print the sha256 digest of the artifact's canonical form.
    #[clap(long, takes_value = false)]
    pub digest: bool,

    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
