//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Flags
//!
//! Desired project state is given with `--namespace`, `--name`,
//! `--description`, `--visibility`, and `--default-branch`. Connection
//! inputs (`--host`, `--token`) fall back to the `GITLAB_HOST` and
//! `GITLAB_TOKEN` environment variables, and finally to an interactive
//! prompt. `--quiet` and `--no-interactive` control prompting and output.

use clap::Parser;

use crate::core::types::Visibility;

/// glmirror - provision GitLab projects as mirror push targets
#[derive(Parser, Debug)]
#[command(name = "glmirror")]
#[command(author, version, about)]
#[command(
    long_about = "Provision a GitLab project as a mirror push target.\n\n\
        Ensures the project exists under the given namespace, reconciles its \
        description and default branch, and protects the default branch with \
        force-push allowed so mirrored history replays are accepted. The run \
        is idempotent: re-running with the same inputs converges to the same \
        state.",
    after_help = "\
OUTPUT:
    On success, two key-value lines for the calling pipeline:
        repo_url=https://<host>/<namespace>/<name>.git
        project_id=<id>

EXAMPLES:
    # Provision a private mirror target on gitlab.com
    glmirror --namespace acme --name svc

    # Self-hosted instance, token from the environment
    GITLAB_TOKEN=glpat-xxx glmirror --host gitlab.example.com \\
        --namespace acme --name svc --default-branch main

    # Non-interactive pipeline usage
    glmirror --quiet --namespace acme --name svc --token glpat-xxx"
)]
pub struct Cli {
    /// GitLab host, e.g. gitlab.com or https://gitlab.example.com
    /// (falls back to $GITLAB_HOST, then gitlab.com)
    #[arg(long)]
    pub host: Option<String>,

    /// Namespace (group or user) the project lives under
    /// (falls back to $GITLAB_NAMESPACE)
    #[arg(long)]
    pub namespace: Option<String>,

    /// Project name
    #[arg(long)]
    pub name: Option<String>,

    /// Project description
    #[arg(long, default_value = "")]
    pub description: String,

    /// Project visibility: private, internal, or public
    #[arg(long, default_value_t = Visibility::Private)]
    pub visibility: Visibility,

    /// Default branch to reconcile and protect
    #[arg(long, default_value = "main")]
    pub default_branch: String,

    /// Personal access token (falls back to $GITLAB_TOKEN, then a prompt)
    #[arg(long)]
    pub token: Option<String>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Minimal output; implies --no-interactive
    #[arg(short, long)]
    pub quiet: bool,

    /// Enable interactive prompts
    #[arg(long = "interactive", conflicts_with = "no_interactive")]
    pub interactive_flag: bool,

    /// Disable interactive prompts
    #[arg(long)]
    pub no_interactive: bool,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }

    /// Determine if interactive mode is enabled.
    ///
    /// Returns true if `--interactive` was explicitly set, or neither
    /// `--no-interactive` nor `--quiet` was given.
    pub fn interactive(&self) -> bool {
        if self.interactive_flag {
            true
        } else {
            !(self.no_interactive || self.quiet)
        }
    }
}
