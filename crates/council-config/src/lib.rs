// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
mod loader;
mod schema;

pub use loader::{
    agent_config_path, agents_config_path, load_agent_config, load_query_config,
    load_team_config, query_config_path,
};
pub use schema::*;
