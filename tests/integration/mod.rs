//! Integration tests for freezable context containers and the context registry

mod context_api;
mod freezer_rules;
mod registry_scopes;
