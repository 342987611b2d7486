//! Built-in commands.
//!
//! Every registry starts with a copy of this table:
//! - `help`: list the registered commands
//! - `pid`: the serving process's id
//! - `ping`: liveness check, always answers `pong`

use crate::registry::{Handler, Registry};

/// A built-in command entry.
pub(crate) struct Builtin {
    pub(crate) name: &'static str,
    pub(crate) description: &'static str,
    pub(crate) run: fn(&Registry, &[String]) -> String,
}

impl Builtin {
    pub(crate) fn handler(&self) -> Handler {
        Handler::with_registry(self.name, self.description, self.run)
    }
}

pub(crate) static BUILTINS: [Builtin; 3] = [
    Builtin {
        name: "help",
        description: "show this message",
        run: help,
    },
    Builtin {
        name: "pid",
        description: "return the Unix process ID of this program",
        run: pid,
    },
    Builtin {
        name: "ping",
        description: "checks whether the connection is working",
        run: ping,
    },
];

const HELP_BANNER: &str = "Available commands:";

fn ping(_: &Registry, _: &[String]) -> String {
    "pong".to_string()
}

fn pid(_: &Registry, _: &[String]) -> String {
    std::process::id().to_string()
}

fn help(registry: &Registry, _: &[String]) -> String {
    let mut lines = vec![HELP_BANNER.to_string(), String::new()];
    lines.extend(
        registry
            .handlers()
            .map(|h| format!("\t{}\t{}", h.name(), h.description())),
    );
    lines.join("\n")
}
