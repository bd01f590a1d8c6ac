//! The three personas and their initialization.
//!
//! Each persona module exposes a `build` function returning a configured
//! [`Agent`](crate::agent::Agent). Initialization is log-and-skip: a
//! persona whose build fails is dropped from the pool, never fatal to the
//! service.

pub mod architect;
pub mod ceo;
pub mod polymath;

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{error, info};

use crate::agent::Agent;
use crate::config::Config;
use crate::llm::LlmClient;

/// Build the agent pool, keyed by route name.
pub fn initialize_agents(
    config: &Config,
    llm: Option<Arc<dyn LlmClient>>,
) -> HashMap<String, Arc<Agent>> {
    let mut agents = HashMap::new();

    let builders: [(&str, BuildFn); 3] = [
        ("ouroboros", architect::build),
        ("ceo", ceo::build),
        ("polymath", polymath::build),
    ];

    for (key, build) in builders {
        match build(config, llm.clone()) {
            Ok(agent) => {
                agents.insert(key.to_string(), Arc::new(agent));
            }
            Err(e) => {
                error!(persona = key, "failed to initialize persona: {}", e);
            }
        }
    }

    info!("initialized {} agent(s)", agents.len());
    agents
}

type BuildFn = fn(&Config, Option<Arc<dyn LlmClient>>) -> anyhow::Result<Agent>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_three_personas_come_up_offline() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = Config::new(dir.path().to_path_buf());

        let agents = initialize_agents(&config, None);

        assert_eq!(agents.len(), 3);
        assert!(agents.contains_key("ouroboros"));
        assert!(agents.contains_key("ceo"));
        assert!(agents.contains_key("polymath"));
    }

    #[test]
    fn an_unwritable_workspace_skips_only_the_architect() {
        // The architect needs its workspace directory; the other personas
        // do not touch the filesystem at build time.
        let config = Config::new("/proc/no-such-workspace".into());

        let agents = initialize_agents(&config, None);

        assert!(!agents.contains_key("ouroboros"));
        assert!(agents.contains_key("ceo"));
        assert!(agents.contains_key("polymath"));
    }
}
