use crate::models::{GeoPoint, TransitMode, VenueCandidate};
use crate::services::provider::{PlacesProvider, ProviderError, RoutingProvider};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com/maps/api";

/// Google Maps Platform client
///
/// Handles both external collaborators of the engine:
/// - Distance Matrix lookups for travel durations
/// - Places Nearby Search for venue candidates
///
/// The API key is optional. Without one every call returns
/// `ProviderError::MissingCredential` and no request is sent.
#[derive(Debug, Clone)]
pub struct GoogleMapsClient {
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

impl GoogleMapsClient {
    /// Create a new client
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url: base_url.into(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            client,
        })
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    fn key(&self) -> Result<&str, ProviderError> {
        self.api_key.as_deref().ok_or(ProviderError::MissingCredential)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    /// GET `url`; the URL carries the key, so it is stripped from transport errors
    async fn send(&self, url: &str) -> Result<reqwest::Response, ProviderError> {
        self.client
            .get(url)
            .send()
            .await
            .map_err(|e| ProviderError::Request(e.without_url()))
    }

    /// Fetch the duration in minutes of a single origin/destination pair
    pub async fn distance_matrix(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
        mode: TransitMode,
    ) -> Result<f64, ProviderError> {
        let key = self.key()?;
        let origin = format_coordinate(origin);
        let destination = format_coordinate(destination);

        tracing::debug!("Distance matrix lookup {} -> {} ({})", origin, destination, mode);

        let url = format!(
            "{}?origins={}&destinations={}&mode={}&key={}",
            self.endpoint("distancematrix/json"),
            urlencoding::encode(&origin),
            urlencoding::encode(&destination),
            mode.as_str(),
            urlencoding::encode(key),
        );

        let response = self.send(&url).await?;

        if !response.status().is_success() {
            return Err(ProviderError::Api {
                status: response.status().to_string(),
                message: "Distance matrix request failed".to_string(),
            });
        }

        let body: DistanceMatrixResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse distance matrix: {}", e.without_url())))?;

        if body.status != "OK" {
            return Err(ProviderError::Api {
                status: body.status,
                message: body.error_message.unwrap_or_default(),
            });
        }

        let element = body
            .rows
            .first()
            .and_then(|row| row.elements.first())
            .ok_or_else(|| ProviderError::InvalidResponse("Missing matrix element".into()))?;

        match element.status.as_str() {
            "OK" => element
                .duration
                .as_ref()
                .map(|d| d.value / 60.0)
                .ok_or_else(|| ProviderError::InvalidResponse("Missing duration".into())),
            "ZERO_RESULTS" | "NOT_FOUND" => Err(ProviderError::NoRoute),
            other => Err(ProviderError::Api {
                status: other.to_string(),
                message: "Unexpected element status".to_string(),
            }),
        }
    }

    /// Query venues of a category around a point
    pub async fn nearby_search(
        &self,
        point: GeoPoint,
        category: &str,
        radius_meters: u32,
    ) -> Result<Vec<VenueCandidate>, ProviderError> {
        let key = self.key()?;
        let location = format_coordinate(point);

        tracing::debug!("Nearby search for '{}' within {}m of {}", category, radius_meters, location);

        let url = format!(
            "{}?location={}&radius={}&type={}&key={}",
            self.endpoint("place/nearbysearch/json"),
            urlencoding::encode(&location),
            radius_meters,
            urlencoding::encode(category),
            urlencoding::encode(key),
        );

        let response = self.send(&url).await?;

        if !response.status().is_success() {
            return Err(ProviderError::Api {
                status: response.status().to_string(),
                message: "Nearby search request failed".to_string(),
            });
        }

        let body: NearbySearchResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse nearby search: {}", e.without_url())))?;

        match body.status.as_str() {
            "OK" => {}
            "ZERO_RESULTS" => return Ok(Vec::new()),
            _ => {
                return Err(ProviderError::Api {
                    status: body.status,
                    message: body.error_message.unwrap_or_default(),
                })
            }
        }

        let venues: Vec<VenueCandidate> = body
            .results
            .into_iter()
            .filter_map(|place| place.into_venue(category))
            .collect();

        tracing::debug!("Nearby search returned {} venues", venues.len());

        Ok(venues)
    }
}

impl RoutingProvider for GoogleMapsClient {
    async fn travel_time(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
        mode: TransitMode,
    ) -> Result<f64, ProviderError> {
        self.distance_matrix(origin, destination, mode).await
    }
}

impl PlacesProvider for GoogleMapsClient {
    async fn nearby(
        &self,
        point: GeoPoint,
        category: &str,
        radius_meters: u32,
    ) -> Result<Vec<VenueCandidate>, ProviderError> {
        self.nearby_search(point, category, radius_meters).await
    }
}

fn format_coordinate(point: GeoPoint) -> String {
    format!("{:.6},{:.6}", point.lat, point.lng)
}

#[derive(Debug, Deserialize)]
struct DistanceMatrixResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    rows: Vec<MatrixRow>,
}

#[derive(Debug, Deserialize)]
struct MatrixRow {
    #[serde(default)]
    elements: Vec<MatrixElement>,
}

#[derive(Debug, Deserialize)]
struct MatrixElement {
    status: String,
    #[serde(default)]
    duration: Option<MatrixValue>,
}

#[derive(Debug, Deserialize)]
struct MatrixValue {
    value: f64,
}

#[derive(Debug, Deserialize)]
struct NearbySearchResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    results: Vec<PlaceResult>,
}

#[derive(Debug, Deserialize)]
struct PlaceResult {
    place_id: String,
    name: String,
    geometry: PlaceGeometry,
    #[serde(default)]
    types: Vec<String>,
    #[serde(default)]
    rating: Option<f64>,
    #[serde(default)]
    user_ratings_total: Option<u32>,
    #[serde(default)]
    price_level: Option<u8>,
    #[serde(default)]
    opening_hours: Option<OpeningHours>,
}

#[derive(Debug, Deserialize)]
struct PlaceGeometry {
    location: PlaceLocation,
}

#[derive(Debug, Deserialize)]
struct PlaceLocation {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
struct OpeningHours {
    #[serde(default)]
    open_now: Option<bool>,
}

impl PlaceResult {
    /// Venues with out-of-range coordinates are dropped
    fn into_venue(self, requested_category: &str) -> Option<VenueCandidate> {
        let coordinate = GeoPoint::new(self.geometry.location.lat, self.geometry.location.lng);
        if !coordinate.is_valid() {
            tracing::debug!("Dropping place {} with invalid coordinate {}", self.place_id, coordinate);
            return None;
        }

        let category = self
            .types
            .into_iter()
            .next()
            .unwrap_or_else(|| requested_category.to_string());

        Some(VenueCandidate {
            external_id: self.place_id,
            name: self.name,
            coordinate,
            category,
            rating: self.rating,
            rating_count: self.user_ratings_total.unwrap_or(0),
            price_level: self.price_level,
            open_now: self.opening_hours.and_then(|h| h.open_now),
            distance_from_point: 0.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client(base_url: &str, key: Option<&str>) -> GoogleMapsClient {
        GoogleMapsClient::new(base_url, key.map(str::to_string), Duration::from_secs(5)).unwrap()
    }

    const ORIGIN: GeoPoint = GeoPoint::new(49.2827, -123.1207);
    const DESTINATION: GeoPoint = GeoPoint::new(49.1666, -123.1336);

    #[test]
    fn test_blank_key_counts_as_missing() {
        assert!(!client(DEFAULT_BASE_URL, Some("  ")).has_credential());
        assert!(client(DEFAULT_BASE_URL, Some("abc")).has_credential());
    }

    #[tokio::test]
    async fn test_distance_matrix_parses_duration() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/distancematrix/json")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("mode".into(), "transit".into()),
                Matcher::UrlEncoded("key".into(), "test_key".into()),
                Matcher::UrlEncoded("origins".into(), "49.282700,-123.120700".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"status":"OK","rows":[{"elements":[{"status":"OK","duration":{"value":1530,"text":"26 mins"}}]}]}"#,
            )
            .create_async()
            .await;

        let minutes = client(&server.url(), Some("test_key"))
            .travel_time(ORIGIN, DESTINATION, TransitMode::Transit)
            .await
            .unwrap();

        assert!((minutes - 25.5).abs() < 1e-9);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_distance_matrix_zero_results_is_no_route() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/distancematrix/json")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"status":"OK","rows":[{"elements":[{"status":"ZERO_RESULTS"}]}]}"#)
            .create_async()
            .await;

        let result = client(&server.url(), Some("k"))
            .travel_time(ORIGIN, DESTINATION, TransitMode::Walking)
            .await;

        assert!(matches!(result, Err(ProviderError::NoRoute)));
    }

    #[tokio::test]
    async fn test_distance_matrix_quota_is_api_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/distancematrix/json")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"status":"OVER_QUERY_LIMIT","error_message":"quota","rows":[]}"#)
            .create_async()
            .await;

        let result = client(&server.url(), Some("k"))
            .travel_time(ORIGIN, DESTINATION, TransitMode::Driving)
            .await;

        match result {
            Err(ProviderError::Api { status, .. }) => assert_eq!(status, "OVER_QUERY_LIMIT"),
            other => panic!("expected api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_key_sends_no_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let maps = client(&server.url(), None);
        let route = maps.travel_time(ORIGIN, DESTINATION, TransitMode::Driving).await;
        let places = maps.nearby(ORIGIN, "cafe", 1000).await;

        assert!(matches!(route, Err(ProviderError::MissingCredential)));
        assert!(matches!(places, Err(ProviderError::MissingCredential)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_transport_error_does_not_expose_key() {
        // Nothing listens on the discard port
        let maps = client("http://127.0.0.1:9", Some("SECRET_KEY_123"));

        let route = maps.travel_time(ORIGIN, DESTINATION, TransitMode::Driving).await;
        let places = maps.nearby(ORIGIN, "cafe", 1000).await;

        for result in [route.map(|_| ()), places.map(|_| ())] {
            match result {
                Err(e @ ProviderError::Request(_)) => {
                    let message = e.to_string();
                    assert!(!message.contains("SECRET_KEY_123"), "key leaked: {}", message);
                    assert!(!message.contains("key="), "query leaked: {}", message);
                }
                other => panic!("expected transport error, got {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_malformed_body_does_not_expose_key() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/distancematrix/json")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let result = client(&server.url(), Some("SECRET_KEY_123"))
            .travel_time(ORIGIN, DESTINATION, TransitMode::Driving)
            .await;

        match result {
            Err(ProviderError::InvalidResponse(message)) => assert!(!message.contains("SECRET_KEY_123")),
            other => panic!("expected invalid response, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_nearby_search_parses_places() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/place/nearbysearch/json")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("type".into(), "cafe".into()),
                Matcher::UrlEncoded("radius".into(), "1500".into()),
            ]))
            .with_status(200)
            .with_body(
                r#"{"status":"OK","results":[
                    {"place_id":"p1","name":"Bean There","geometry":{"location":{"lat":49.2240,"lng":-123.1270}},
                     "types":["cafe","food"],"rating":4.6,"user_ratings_total":310,"price_level":2,
                     "opening_hours":{"open_now":true}},
                    {"place_id":"p2","name":"No Hours","geometry":{"location":{"lat":49.2250,"lng":-123.1280}}},
                    {"place_id":"bad","name":"Broken","geometry":{"location":{"lat":123.0,"lng":0.0}}}
                ]}"#,
            )
            .create_async()
            .await;

        let venues = client(&server.url(), Some("k"))
            .nearby(GeoPoint::new(49.22465, -123.12715), "cafe", 1500)
            .await
            .unwrap();

        assert_eq!(venues.len(), 2);
        assert_eq!(venues[0].external_id, "p1");
        assert_eq!(venues[0].rating_count, 310);
        assert_eq!(venues[0].open_now, Some(true));
        assert_eq!(venues[1].category, "cafe");
        assert_eq!(venues[1].rating, None);
        assert_eq!(venues[1].open_now, None);
    }

    #[tokio::test]
    async fn test_nearby_search_zero_results_is_empty() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/place/nearbysearch/json")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"status":"ZERO_RESULTS","results":[]}"#)
            .create_async()
            .await;

        let venues = client(&server.url(), Some("k"))
            .nearby(ORIGIN, "bar", 500)
            .await
            .unwrap();
        assert!(venues.is_empty());
    }
}
