//! Skills: discovery and introspection of skill units.
//!
//! A skill unit is a directory under the skills root bundling a SKILL.md
//! descriptor (first line = one-line summary) and python entry points. Every
//! entry point is dual-mode: run normally it does its work; run with the
//! schema env flag set it prints an argument schema and exits 0.

mod render;
mod schema;
mod store;

pub use render::render_skill;
pub use schema::{extract_schema, ArgumentSchema};
pub use store::{SkillStore, SkillUnit, SCRIPT_EXTENSION, SKILL_MARKDOWN};
