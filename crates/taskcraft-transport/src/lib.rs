//! # TaskCraft Transport
//!
//! The container execution backend: a [`ContainerRunner`](taskcraft_core::ContainerRunner)
//! implementation that dials the Docker Engine API (Docker or rootless
//! Podman, which is API-compatible) to run a job's containerized work.

pub mod container;

pub use container::ContainerDriver;
