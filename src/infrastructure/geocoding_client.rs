use crate::infrastructure::error::InfraError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn validate(&self) -> Result<(), InfraError> {
        let in_range = (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude);
        if !in_range {
            return Err(InfraError::Geocoding(format!(
                "coordinates out of range: {}, {}",
                self.latitude, self.longitude
            )));
        }
        Ok(())
    }
}

#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    /// `Ok(None)` when the position has no named locality.
    async fn locality(&self, coordinates: Coordinates) -> Result<Option<String>, InfraError>;
}

#[derive(Debug, Clone)]
pub struct OpenCageGeocoder {
    client: Client,
    endpoint: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct GeocodePayload {
    #[serde(default)]
    results: Vec<GeocodeResult>,
    status: Option<GeocodeStatus>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    #[serde(default)]
    components: GeocodeComponents,
}

#[derive(Debug, Default, Deserialize)]
struct GeocodeComponents {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeStatus {
    message: Option<String>,
}

impl OpenCageGeocoder {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl ReverseGeocoder for OpenCageGeocoder {
    async fn locality(&self, coordinates: Coordinates) -> Result<Option<String>, InfraError> {
        coordinates.validate()?;
        let query = format!("{} {}", coordinates.latitude, coordinates.longitude);
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("q", query.as_str()), ("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|error| InfraError::Geocoding(format!("request failed: {error}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| InfraError::Geocoding(format!("failed reading response: {error}")))?;
        let parsed = serde_json::from_str::<GeocodePayload>(&body)
            .map_err(|error| InfraError::Geocoding(format!("invalid payload: {error}")))?;

        if !status.is_success() {
            let message = parsed
                .status
                .and_then(|status| status.message)
                .unwrap_or_else(|| format!("http {}", status.as_u16()));
            return Err(InfraError::Geocoding(message));
        }

        Ok(parsed.results.into_iter().next().and_then(|result| {
            let components = result.components;
            components
                .city
                .or(components.town)
                .or(components.village)
                .filter(|name| !name.trim().is_empty())
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::{
        matchers::{method, path, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    fn geocoder_for(server: &MockServer) -> OpenCageGeocoder {
        OpenCageGeocoder::new(format!("{}/geocode/v1/json", server.uri()), "geo-key")
    }

    #[tokio::test]
    async fn city_is_read_from_first_result() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/geocode/v1/json"))
            .and(query_param("q", "52.52 13.405"))
            .and(query_param("key", "geo-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [
                    { "components": { "city": "Berlin", "country": "Germany" } },
                    { "components": { "city": "Potsdam" } }
                ],
                "status": { "code": 200, "message": "OK" }
            })))
            .mount(&server)
            .await;

        let locality = geocoder_for(&server)
            .locality(Coordinates { latitude: 52.52, longitude: 13.405 })
            .await
            .expect("locality");
        assert_eq!(locality.as_deref(), Some("Berlin"));
    }

    #[tokio::test]
    async fn town_is_used_when_city_is_missing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [{ "components": { "town": "Hallstatt" } }]
            })))
            .mount(&server)
            .await;

        let locality = geocoder_for(&server)
            .locality(Coordinates { latitude: 47.56, longitude: 13.64 })
            .await
            .expect("locality");
        assert_eq!(locality.as_deref(), Some("Hallstatt"));
    }

    #[tokio::test]
    async fn empty_results_mean_no_locality() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": [] })))
            .mount(&server)
            .await;

        let locality = geocoder_for(&server)
            .locality(Coordinates { latitude: 0.0, longitude: 0.0 })
            .await
            .expect("locality");
        assert_eq!(locality, None);
    }

    #[tokio::test]
    async fn rejected_key_reports_status_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "results": [],
                "status": { "code": 401, "message": "invalid API key" }
            })))
            .mount(&server)
            .await;

        let error = geocoder_for(&server)
            .locality(Coordinates { latitude: 1.0, longitude: 1.0 })
            .await
            .expect_err("rejected");
        assert_eq!(error.to_string(), "geocoding error: invalid API key");
    }

    #[test]
    fn out_of_range_coordinates_are_rejected() {
        assert!(Coordinates { latitude: 91.0, longitude: 0.0 }.validate().is_err());
        assert!(Coordinates { latitude: -33.9, longitude: 151.2 }.validate().is_ok());
    }
}
