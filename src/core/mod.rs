// ─── Nocturne Core ───
// Orchestration engine behind the launcher.
//
// Architecture:
//   core/
//     cli        — recognized command-line flags
//     settings   — settings/users stores, filter model
//     version    — remote manifest + installed-version catalog
//     downloader — SHA-1 validated downloads with progress
//     install    — install backend boundary + cancellable pipeline
//     launch     — identity, JVM argument merge, Java resolution
//     process    — game process supervision + crash classification
//     updater    — self-update state machine
//     paths      — application data layout

pub mod cli;
pub mod downloader;
pub mod error;
pub mod http;
pub mod install;
pub mod launch;
pub mod paths;
pub mod process;
pub mod settings;
pub mod updater;
pub mod version;
