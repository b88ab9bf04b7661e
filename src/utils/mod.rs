pub mod ip_utils; // Address to bit conversion helpers
