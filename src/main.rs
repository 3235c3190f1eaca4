//! glmirror binary entry point.

use glmirror::ui::output;

fn main() {
    if let Err(err) = glmirror::cli::run() {
        output::error(format!("{:#}", err));
        std::process::exit(1);
    }
}
