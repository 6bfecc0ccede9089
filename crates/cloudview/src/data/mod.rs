// src/data/mod.rs
//! Point data handled by the viewer.
//!
//! This module provides:
//! - The immutable [`PointSet`] installed by each load.
//! - The flat [`PointRecord`] handed to the presentation layer, and its
//!   GPU-ready [`PointInstance`] form.
//! - Ingestion of Qt point cloud payloads (`point_cloud`).

pub mod point_cloud;
pub mod types;

pub use self::point_cloud::Ingested;
pub use self::types::{PointInstance, PointRecord, PointSet, Rgb};
