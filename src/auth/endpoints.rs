/// Ring OAuth and REST endpoints.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub oauth_token: String,
    pub api: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            oauth_token: "https://oauth.ring.com/oauth/token".to_string(),
            api: "https://api.ring.com/clients_api".to_string(),
        }
    }
}

impl Endpoints {
    pub fn session(&self) -> String {
        format!("{}/session", self.api)
    }

    pub fn devices(&self) -> String {
        format!("{}/ring_devices", self.api)
    }

    pub fn history(&self, device_id: u64) -> String {
        format!("{}/doorbots/{}/history", self.api, device_id)
    }

    pub fn recording(&self, event_id: u64) -> String {
        format!("{}/dings/{}/recording", self.api, event_id)
    }

    /// Share/play endpoint; answers with a pre-signed URL when the primary
    /// recording route does not have the file.
    pub fn share_play(&self, event_id: u64) -> String {
        format!("{}/dings/{}/share/play", self.api, event_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routes() {
        let e = Endpoints::default();
        assert_eq!(
            e.history(42),
            "https://api.ring.com/clients_api/doorbots/42/history"
        );
        assert_eq!(
            e.recording(7),
            "https://api.ring.com/clients_api/dings/7/recording"
        );
        assert_eq!(
            e.share_play(7),
            "https://api.ring.com/clients_api/dings/7/share/play"
        );
        assert_eq!(e.devices(), "https://api.ring.com/clients_api/ring_devices");
    }
}
