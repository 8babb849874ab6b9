use anyhow::bail;
use clap::{Parser, ValueEnum};
use shardseq::{
    DEFAULT_BASE_PATH, DEFAULT_MAX_SEQUENCE, GeneratorConfig, ParsePolicy, SelectionMode,
    ShardLayout,
};

/// Runtime configuration for the `shardseq-server` binary.
///
/// All values are parsed from CLI arguments or environment variables, with
/// defaults matching the reference layout: counters under `/id-counter`, one
/// million IDs of headroom per shard.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "shardseq-server",
    version,
    about = "An HTTP service for sharded, compare-and-swap allocated IDs"
)]
pub struct CliArgs {
    /// Number of shards, one counter node and one coordination client each.
    ///
    /// Shard `i` owns the IDs above `(i + 1) * 1_000_000`.
    ///
    /// Environment variable: `SHARD_COUNT`
    #[arg(long, env = "SHARD_COUNT", default_value_t = 3)]
    pub shard_count: usize,

    /// Parent node of every counter; counters live at `<base>/shard-<i>`.
    ///
    /// Environment variable: `BASE_PATH`
    #[arg(long, env = "BASE_PATH", default_value_t = String::from(DEFAULT_BASE_PATH))]
    pub base_path: String,

    /// Largest counter value a shard may hold before it is exhausted.
    ///
    /// Must stay below the 1,000,000 spacing between shard offsets.
    ///
    /// Environment variable: `MAX_SEQUENCE`
    #[arg(long, env = "MAX_SEQUENCE", default_value_t = DEFAULT_MAX_SEQUENCE)]
    pub max_sequence: u64,

    /// How shards are picked across the attempts of one request.
    ///
    /// Environment variable: `SELECTION_MODE`
    #[arg(long, env = "SELECTION_MODE", value_enum, default_value_t = SelectionArg::WithoutReplacement)]
    pub selection_mode: SelectionArg,

    /// What to do with a counter value that is not a decimal integer.
    ///
    /// Environment variable: `PARSE_POLICY`
    #[arg(long, env = "PARSE_POLICY", value_enum, default_value_t = ParsePolicyArg::ZeroOnCorrupt)]
    pub parse_policy: ParsePolicyArg,

    /// Address to listen on.
    ///
    /// Example: "0.0.0.0:3000"
    ///
    /// Environment variable: `SERVER_ADDR`
    #[arg(long, env = "SERVER_ADDR", default_value_t = String::from("0.0.0.0:3000"))]
    pub server_addr: String,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionArg {
    Independent,
    WithoutReplacement,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsePolicyArg {
    ZeroOnCorrupt,
    Reject,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub layout: ShardLayout,
    pub generator: GeneratorConfig,
    pub server_addr: String,
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.shard_count == 0 {
            bail!("SHARD_COUNT must be greater than 0");
        }

        let layout =
            ShardLayout::new(args.base_path, args.shard_count).with_max_sequence(args.max_sequence);
        layout.validate()?;

        let generator = GeneratorConfig {
            selection: match args.selection_mode {
                SelectionArg::Independent => SelectionMode::Independent,
                SelectionArg::WithoutReplacement => SelectionMode::WithoutReplacement,
            },
            parse_policy: match args.parse_policy {
                ParsePolicyArg::ZeroOnCorrupt => ParsePolicy::ZeroOnCorrupt,
                ParsePolicyArg::Reject => ParsePolicy::Reject,
            },
        };

        Ok(Self {
            layout,
            generator,
            server_addr: args.server_addr,
        })
    }
}
