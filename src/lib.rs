pub mod allconfig;
pub mod colors;
pub mod error;
pub mod host;
pub mod ini;
mod output;
pub mod paths;
pub mod render;
pub mod resolver;

pub use allconfig::{resolve_output_path, AllConfig, Generated, DEFAULT_OUTPUT};
pub use colors::{should_use_colors, Colors, Tone};
pub use error::{Error, Result};
pub use host::{load_config, ConfigStore, Event, LoadedConfig, MergedConfig, Printer};
pub use output::{print_diff, print_error, Config, OutputContext, OutputMode, RunResult};
pub use render::{render, write_output, HEADER};
pub use resolver::{expand_include, resolve, ProvenanceMap};

use std::fs;
use std::path::Path;

use tracing::debug;

/// Main entry point: load `config_path`, then flatten it per `config`.
///
/// Writing goes through the host's connect event so the extension runs
/// exactly as it would inside the host. Check, stdout and JSON modes only
/// generate.
pub fn run(config_path: &Path, config: &Config, ctx: &OutputContext) -> Result<RunResult> {
    let loaded = load_config(config_path)?;
    let allconfig = AllConfig::new(&loaded).with_output(config.output.as_deref());
    let output_path = allconfig.output_path().to_path_buf();

    let mut result = RunResult {
        sections: loaded.sections().len(),
        changed: false,
        failed_handlers: 0,
    };

    match config.output_mode {
        OutputMode::Stdout => {
            let generated = allconfig.generate(&loaded)?;
            output::print_rendered(&generated.text);
            return Ok(result);
        }
        OutputMode::Json => {
            let generated = allconfig.generate(&loaded)?;
            let json = output::provenance_json(&generated.provenance, loaded.config_dir())?;
            output::print_provenance_json(&json);
            return Ok(result);
        }
        _ => {}
    }

    let previous = fs::read_to_string(&output_path).ok();

    if config.check_only {
        let generated = allconfig.generate(&loaded)?;
        result.changed = previous.as_deref() != Some(generated.text.as_str());
        output::print_check_result(&output_path, previous.as_deref(), &generated.text, ctx);
        return Ok(result);
    }

    let mut printer = Printer::new(loaded);
    allconfig.register(&mut printer);
    result.failed_handlers = printer.send_event(Event::Connect);
    if result.failed_handlers > 0 {
        return Ok(result);
    }

    let current = fs::read_to_string(&output_path).map_err(|source| Error::Read {
        path: output_path.clone(),
        source,
    })?;
    result.changed = previous.as_deref() != Some(current.as_str());
    debug!(changed = result.changed, "flattened config written");

    output::print_write_result(&output_path, previous.as_deref(), &current, &result, ctx);

    Ok(result)
}
