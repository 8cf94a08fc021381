use std::net::{IpAddr, Ipv4Addr};

use crate::sim::state::Display;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the API and metrics servers to
    pub bind_address: IpAddr,
    /// Control API port
    pub port: u16,
    /// Metrics port, 0 disables the metrics server
    pub metrics_port: u16,
    /// Simulated display width in pixels
    pub display_width: f64,
    /// Simulated display height in pixels
    pub display_height: f64,
    /// Seed for corner-trap jitter; random when unset
    pub seed: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: 9099,
            metrics_port: 9090,
            display_width: 1280.0,
            display_height: 720.0,
            seed: None,
        }
    }
}

impl ServerConfig {
    /// Load config from environment or use defaults
    pub fn load_or_default() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = lookup("BIND_ADDRESS") {
            if let Ok(parsed) = addr.parse() {
                config.bind_address = parsed;
            } else {
                tracing::warn!("Invalid BIND_ADDRESS '{}', using default", addr);
            }
        }

        if let Some(port) = lookup("PORT") {
            match port.parse::<u16>() {
                Ok(parsed) if parsed > 0 => config.port = parsed,
                Ok(_) => tracing::warn!("PORT must be > 0, using default"),
                Err(_) => tracing::warn!("Invalid PORT '{}', using default", port),
            }
        }

        if let Some(port) = lookup("METRICS_PORT") {
            if let Ok(parsed) = port.parse::<u16>() {
                config.metrics_port = parsed;
            } else {
                tracing::warn!("Invalid METRICS_PORT '{}', using default", port);
            }
        }

        for (key, slot) in [
            ("DISPLAY_WIDTH", &mut config.display_width),
            ("DISPLAY_HEIGHT", &mut config.display_height),
        ] {
            if let Some(value) = lookup(key) {
                match value.parse::<f64>() {
                    Ok(parsed) if parsed.is_finite() && parsed > 0.0 => *slot = parsed,
                    _ => tracing::warn!("Invalid {} '{}', using default", key, value),
                }
            }
        }

        if let Some(seed) = lookup("SIM_SEED") {
            if let Ok(parsed) = seed.parse::<u64>() {
                config.seed = Some(parsed);
            } else {
                tracing::warn!("Invalid SIM_SEED '{}', using a random seed", seed);
            }
        }

        config
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), String> {
        if self.port == 0 {
            return Err("Port cannot be 0".to_string());
        }
        if self.metrics_port == self.port {
            return Err("METRICS_PORT must differ from PORT".to_string());
        }
        if !(self.display_width.is_finite() && self.display_width > 0.0)
            || !(self.display_height.is_finite() && self.display_height > 0.0)
        {
            return Err("Display dimensions must be positive".to_string());
        }
        Ok(())
    }

    pub fn display(&self) -> Display {
        Display::new(self.display_width, self.display_height)
    }
}
