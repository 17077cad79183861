//! Command-line arguments of the gateway binary.

use std::path::PathBuf;

use clap::Parser;

use super::styles;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Sandgate CLI - a gateway that provisions sandboxed agent workloads and routes traffic to them
#[derive(Debug, Parser)]
#[command(name = "sandgate", author, about, version, styles=styles::styles())]
pub struct SandgateArgs {
    /// The subcommand to run
    #[command(subcommand)]
    pub subcommand: Option<SandgateSubcommand>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Available subcommands
#[derive(Debug, Parser)]
pub enum SandgateSubcommand {
    /// Run the gateway server
    #[command(name = "serve")]
    Serve {
        /// Address to listen on
        #[arg(long, value_name = "ADDR", env = "SANDGATE_ADDR")]
        addr: Option<String>,

        /// Namespace to provision sandboxes into
        #[arg(long, value_name = "NAMESPACE", env = "SANDGATE_NAMESPACE")]
        namespace: Option<String>,

        /// Path to the environment catalog file
        #[arg(long, value_name = "FILE", env = "SANDGATE_ENVIRONMENTS")]
        environments: Option<PathBuf>,
    },
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_flags_parse() -> anyhow::Result<()> {
        let args = SandgateArgs::try_parse_from([
            "sandgate",
            "--verbose",
            "serve",
            "--addr",
            "127.0.0.1:9000",
            "--namespace",
            "agents",
        ])?;

        assert!(args.verbose);
        let Some(SandgateSubcommand::Serve {
            addr,
            namespace,
            environments,
        }) = args.subcommand
        else {
            anyhow::bail!("expected serve subcommand");
        };
        assert_eq!(addr.as_deref(), Some("127.0.0.1:9000"));
        assert_eq!(namespace.as_deref(), Some("agents"));
        assert_eq!(environments, None);

        Ok(())
    }

    #[test]
    fn test_bare_invocation_parses() -> anyhow::Result<()> {
        let args = SandgateArgs::try_parse_from(["sandgate"])?;

        assert!(!args.verbose);
        assert!(args.subcommand.is_none());

        Ok(())
    }
}
