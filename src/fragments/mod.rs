//! Server-code fragment discovery and bundle composition.
//!
//! Fragments are contributed by installed extensions and by the project
//! itself, in that precedence order. The collector discovers them; the
//! composer merges them last-writer-wins, compiles each file through the
//! host's registered compiler, and concatenates the result into the single
//! server bundle asset.

pub mod collector;
pub mod composer;

pub use collector::{
    ExtensionDescriptor, FRAGMENT_DIR, Fragment, FragmentOrigin, ProjectDescriptor,
    collect_fragments,
};
pub use composer::{
    CompiledBundle, Compiler, MODULE_NAMESPACE, PassthroughCompiler, artifact_base_name, compose,
};
