//! Dev token issuer.
//!
//! Mints a signed bearer token the gateway will accept, for local
//! development, operational poking, and wiring up test clients. In
//! production the REST tier mints tokens at login with the same shared
//! secret; this binary exists so the gateway can be exercised without it.
//!
//! Usage:
//!   TRACKWIRE_AUTH_SECRET=... cargo run --bin token-issuer -- \
//!     --user-id 1 --email dev@example.com --role developer

use clap::Parser;

use trackwire_sdk::types::{Identity, Role};
use trackwire_server::auth::mint_token;

#[derive(Parser)]
#[command(name = "token-issuer", about = "Mint a trackwire gateway token")]
struct Args {
    #[arg(long)]
    user_id: i64,

    #[arg(long)]
    email: String,

    #[arg(long, value_enum, default_value = "developer")]
    role: RoleArg,

    /// Shared secret; must match the gateway's.
    #[arg(long, env = "TRACKWIRE_AUTH_SECRET")]
    secret: String,

    /// Token lifetime in hours.
    #[arg(long, default_value_t = 1)]
    ttl_hours: i64,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum RoleArg {
    Manager,
    Developer,
    Tester,
}

impl From<RoleArg> for Role {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Manager => Role::Manager,
            RoleArg::Developer => Role::Developer,
            RoleArg::Tester => Role::Tester,
        }
    }
}

fn main() {
    let args = Args::parse();
    let identity = Identity {
        id: args.user_id,
        email: args.email.clone(),
        role: args.role.into(),
    };
    let token = mint_token(
        &args.secret,
        &identity,
        chrono::Duration::hours(args.ttl_hours),
    );
    println!("{token}");
}
