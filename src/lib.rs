// SPDX-License-Identifier: MIT

//! strand-rs - a workflow execution engine for content pipelines
//!
//! A workflow is a directed acyclic graph of typed nodes (data sources,
//! sub-agent calls, transforms, persistence steps) executed in dependency
//! order. Node outputs are threaded to downstream nodes through `{{path}}`
//! template variables resolved against the run context.

pub mod services;
pub mod strand;
