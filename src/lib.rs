// ==============================================================================
// lib.rs - MAF Overlap Library
// ==============================================================================
// Description: Library interface for MC3/GDC MAF loading and overlap modules
// Author: Matt Barham
// Created: 2025-11-03
// Modified: 2026-10-19
// Version: 2.0.0
// ==============================================================================

pub mod bed;
pub mod config;
pub mod dialect;
pub mod discovery;
pub mod loader;
pub mod models;
pub mod overlap;
pub mod parsers;
pub mod pipeline;
pub mod schema;
pub mod store;
