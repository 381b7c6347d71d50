///! URL builders for the Launch Library and NASA endpoints
use crate::config::BackendConfig;

#[derive(Debug, Clone)]
pub struct LaunchLibrary {
    base_url: String,
    limit: u32,
}

impl LaunchLibrary {
    pub fn new(base_url: impl Into<String>, limit: u32) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            limit,
        }
    }

    pub fn upcoming(&self) -> String {
        format!("{}/launch/upcoming/?limit={}&mode=detailed", self.base_url, self.limit)
    }

    pub fn previous(&self) -> String {
        format!("{}/launch/previous/?limit={}&mode=detailed", self.base_url, self.limit)
    }

    pub fn launch(&self, id: &str) -> String {
        format!("{}/launch/{}/", self.base_url, urlencoding::encode(id))
    }
}

#[derive(Debug, Clone)]
pub struct NasaApi {
    api_url: String,
    images_url: String,
    api_key: String,
}

impl NasaApi {
    pub fn new(
        api_url: impl Into<String>,
        images_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            images_url: images_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    pub fn apod(&self) -> String {
        format!("{}/planetary/apod?api_key={}", self.api_url, self.api_key)
    }

    pub fn image_search(&self, query: &str, page: u32) -> String {
        format!(
            "{}/search?q={}&page={}&media_type=image",
            self.images_url,
            urlencoding::encode(query),
            page
        )
    }

    pub fn epic_natural(&self) -> String {
        format!("{}/EPIC/api/natural?api_key={}", self.api_url, self.api_key)
    }
}

impl From<&BackendConfig> for LaunchLibrary {
    fn from(config: &BackendConfig) -> Self {
        LaunchLibrary::new(config.launch_library_url.clone(), config.launch_limit)
    }
}

impl From<&BackendConfig> for NasaApi {
    fn from(config: &BackendConfig) -> Self {
        NasaApi::new(
            config.nasa_api_url.clone(),
            config.nasa_images_url.clone(),
            config.nasa_api_key.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_library_urls() {
        let ll = LaunchLibrary::new("https://ll.thespacedevs.com/2.2.0/", 10);
        assert_eq!(
            ll.upcoming(),
            "https://ll.thespacedevs.com/2.2.0/launch/upcoming/?limit=10&mode=detailed"
        );
        assert_eq!(
            ll.previous(),
            "https://ll.thespacedevs.com/2.2.0/launch/previous/?limit=10&mode=detailed"
        );
        assert_eq!(
            ll.launch("e3df2ecd-c239"),
            "https://ll.thespacedevs.com/2.2.0/launch/e3df2ecd-c239/"
        );
        assert_eq!(ll.launch("../x"), "https://ll.thespacedevs.com/2.2.0/launch/..%2Fx/");
    }

    #[test]
    fn test_nasa_urls() {
        let nasa = NasaApi::from(&BackendConfig::default());
        assert_eq!(nasa.apod(), "https://api.nasa.gov/planetary/apod?api_key=DEMO_KEY");
        assert_eq!(
            nasa.image_search("mars rover", 2),
            "https://images-api.nasa.gov/search?q=mars%20rover&page=2&media_type=image"
        );
        assert_eq!(
            nasa.epic_natural(),
            "https://api.nasa.gov/EPIC/api/natural?api_key=DEMO_KEY"
        );
    }
}
