use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "outlook")]
#[command(about = "Outlook MCP adapter - sign in, inspect and call Microsoft Graph tools")]
#[command(version)]
#[command(after_help = "\x1b[1;36mQuick Start:\x1b[0m
  outlook login                            Sign in with a device code
  outlook whoami                           Show the signed-in profile
  outlook tools                            List every tool
  outlook call list_messages --args '{\"folder\":\"inbox\",\"top\":5}'

\x1b[1;36mConfiguration:\x1b[0m
  OUTLOOK_CLIENT_ID must be set (environment or .env).
  outlook config                           Show the effective settings")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Pretty)]
    pub output: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in with the device-code flow and cache the credential
    Login,

    /// Forget the cached credential
    Logout,

    /// Show the signed-in user's profile
    Whoami,

    /// List the tools the server exposes
    #[command(alias = "ls")]
    Tools {
        /// Show the input schema of each tool
        #[arg(long)]
        schema: bool,
    },

    /// Call a tool and print its result envelope
    #[command(after_help = "\x1b[1;33mExamples:\x1b[0m
  outlook call get_profile
  outlook call send_email --args '{\"subject\":\"Hi\",\"body\":\"Test\",\"to_email\":\"a@b.com\"}'
  outlook call list_events top=5 timezone=UTC")]
    Call {
        /// Tool id
        tool: String,
        /// Arguments as a JSON object
        #[arg(long)]
        args: Option<String>,
        /// Extra arguments as key=value pairs (values are parsed as JSON when possible)
        #[arg(trailing_var_arg = true)]
        params: Vec<String>,
    },

    /// Print the built-in tool manifest
    Manifest {
        /// Emit YAML instead of JSON
        #[arg(long)]
        yaml: bool,
    },

    /// Show the effective configuration
    Config,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable formatted output
    Pretty,
    /// JSON output
    Json,
    /// YAML output
    Yaml,
}
