use std::collections::HashMap;
use std::env;

#[cfg(test)]
use mockall::automock;

/// Read access to a set of environment variables
#[cfg_attr(test, automock)]
pub trait Environment: Send + Sync {
    fn get_var(&self, key: &str) -> Option<String>;
}

/// The process environment
pub struct ProcessEnvironment;

impl Environment for ProcessEnvironment {
    fn get_var(&self, key: &str) -> Option<String> {
        env::var(key).ok()
    }
}

/// Environment bindings supplied with a single request
#[derive(Debug, Clone, Default)]
pub struct RequestEnvironment {
    vars: HashMap<String, String>,
}

impl RequestEnvironment {
    pub fn new(vars: HashMap<String, String>) -> Self {
        Self { vars }
    }
}

impl Environment for RequestEnvironment {
    fn get_var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

/// Where an API key was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    Request,
    RequestEnvironment,
    ProcessEnvironment,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Look up an API key in order: the request's key map (by provider display name), the
/// request environment, then the process environment. Blank values count as absent.
pub fn get_api_key(
    provider_name: &str,
    env_var: &str,
    api_keys: &HashMap<String, String>,
    request_env: &dyn Environment,
    process_env: &dyn Environment,
) -> Option<(String, KeySource)> {
    let from_request = api_keys.get(provider_name).cloned().or_else(|| {
        api_keys
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(provider_name))
            .map(|(_, key)| key.clone())
    });

    if let Some(key) = non_empty(from_request) {
        return Some((key, KeySource::Request));
    }
    if let Some(key) = non_empty(request_env.get_var(env_var)) {
        return Some((key, KeySource::RequestEnvironment));
    }
    non_empty(process_env.get_var(env_var)).map(|key| (key, KeySource::ProcessEnvironment))
}
