use anyhow::Result;

use crate::args::{Cli, Commands};
use crate::handlers;

pub fn run(cli: Cli) -> Result<()> {
    let data_dir = cli.data_dir;

    match cli.command {
        Commands::Serve { addr, mirror_addr } => {
            handlers::serve::handle(data_dir.as_deref(), addr, mirror_addr)
        }
        Commands::Sessions { user, format } => {
            handlers::sessions::handle(data_dir.as_deref(), &user, format)
        }
        Commands::Show { session_id } => handlers::show::handle(data_dir.as_deref(), &session_id),
        Commands::Export {
            session_id,
            out,
            fps,
            width,
            height,
            settle_ms,
        } => handlers::export::handle(
            data_dir.as_deref(),
            &session_id,
            handlers::export::ExportArgs {
                out,
                fps,
                width,
                height,
                settle_ms,
            },
        ),
        Commands::Demo {
            server,
            mirror_addr,
            user,
            events,
        } => handlers::demo::handle(&server, &mirror_addr, &user, events),
    }
}
