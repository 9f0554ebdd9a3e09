use chrono::Local;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use weather_core::{Units, WeatherError, WeatherProvider, WeatherRequest, present};

use crate::render::Renderer;

/// Everything a request needs; shared read-only between requests.
#[derive(Debug, Clone)]
pub struct AppState {
    provider: Arc<dyn WeatherProvider>,
    renderer: Arc<Renderer>,
    image_host: Arc<str>,
}

impl AppState {
    pub fn new(provider: Arc<dyn WeatherProvider>, renderer: Arc<Renderer>, image_host: &str) -> Self {
        Self {
            provider,
            renderer,
            image_host: Arc::from(image_host),
        }
    }

    fn home_page(&self) -> Result<String, PageError> {
        Ok(self.renderer.render("home.html", present::home_context(Local::now()))?)
    }

    async fn results_page(&self, query: ResultsQuery) -> Result<String, PageError> {
        let city = required(query.city, "city")?;
        let units = query.units.map(Units::from);

        let reading = self
            .provider
            .get_weather(&WeatherRequest::new(city.clone(), units.clone()))
            .await?;

        let context =
            present::results_context(Local::now(), &city, units.as_ref(), &reading, &self.image_host)?;

        Ok(self.renderer.render("results.html", context)?)
    }

    async fn comparison_page(&self, query: ComparisonQuery) -> Result<String, PageError> {
        let city1 = required(query.city1, "city1")?;
        let city2 = required(query.city2, "city2")?;
        let units = query.units.map(Units::from);

        let request1 = WeatherRequest::new(city1.clone(), units.clone());
        let request2 = WeatherRequest::new(city2.clone(), units.clone());
        let (reading1, reading2) = tokio::try_join!(
            self.provider.get_weather(&request1),
            self.provider.get_weather(&request2),
        )?;

        let context = present::comparison_context(
            Local::now(),
            (&city1, &reading1),
            (&city2, &reading2),
            units.as_ref(),
        )?;

        Ok(self.renderer.render("comparison_results.html", context)?)
    }
}

/// Absent and blank values are both rejected.
fn required(value: Option<String>, name: &'static str) -> Result<String, WeatherError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(WeatherError::InvalidParameter(name))
}

#[derive(Debug, Deserialize)]
pub struct ResultsQuery {
    city: Option<String>,
    units: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ComparisonQuery {
    city1: Option<String>,
    city2: Option<String>,
    units: Option<String>,
}

#[derive(Debug)]
enum PageError {
    Weather(WeatherError),
    Render(minijinja::Error),
}

impl From<WeatherError> for PageError {
    fn from(err: WeatherError) -> Self {
        PageError::Weather(err)
    }
}

impl From<minijinja::Error> for PageError {
    fn from(err: minijinja::Error) -> Self {
        PageError::Render(err)
    }
}

#[derive(Debug)]
struct Failure(PageError);
impl warp::reject::Reject for Failure {}

fn reject(err: PageError) -> Rejection {
    warp::reject::custom(Failure(err))
}

pub async fn run(address: SocketAddr, state: AppState) {
    let routes = routes(state).with(warp::log("weather::http"));

    log::info!("Listening on http://{address}");
    warp::serve(routes).run(address).await
}

pub fn routes(state: AppState) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let renderer = state.renderer.clone();

    let home_route = warp::path::end()
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(home);

    let results_route = warp::path!("results")
        .and(warp::get())
        .and(warp::query::<ResultsQuery>())
        .and(with_state(state.clone()))
        .and_then(results);

    let comparison_route = warp::path!("comparison_results")
        .and(warp::get())
        .and(warp::query::<ComparisonQuery>())
        .and(with_state(state))
        .and_then(comparison_results);

    home_route
        .or(results_route)
        .or(comparison_route)
        .recover(move |err: Rejection| rejection(err, renderer.clone()))
}

fn with_state(state: AppState) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

pub async fn home(state: AppState) -> Result<impl Reply, Rejection> {
    state.home_page().map(warp::reply::html).map_err(reject)
}

pub async fn results(query: ResultsQuery, state: AppState) -> Result<impl Reply, Rejection> {
    state.results_page(query).await.map(warp::reply::html).map_err(reject)
}

pub async fn comparison_results(
    query: ComparisonQuery,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    state.comparison_page(query).await.map(warp::reply::html).map_err(reject)
}

#[derive(Serialize)]
struct ErrorMessage {
    code: u16,
    message: String,
}

pub async fn rejection(err: Rejection, renderer: Arc<Renderer>) -> Result<impl Reply, Infallible> {
    let (code, message) = if let Some(Failure(page_err)) = err.find() {
        match page_err {
            PageError::Weather(e) => {
                let code = StatusCode::from_u16(e.status_code())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                if code.is_server_error() {
                    log::error!("Request failed: {e}");
                } else {
                    log::info!("Request rejected: {e}");
                }
                (code, e.to_string())
            }
            PageError::Render(e) => {
                log::error!("Template rendering failed: {e:#}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error.".to_string())
            }
        }
    } else if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Page not found.".to_string())
    } else if err.find::<warp::reject::InvalidQuery>().is_some() {
        (StatusCode::BAD_REQUEST, "Invalid query string.".to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed.".to_string())
    } else {
        log::error!("Error: {:?}", err);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error.".to_string())
    };

    let context = ErrorMessage { code: code.as_u16(), message };
    let body = renderer.render("error.html", &context).unwrap_or_else(|e| {
        log::error!("Error page rendering failed: {e}");
        format!("Error {}: {}", context.code, context.message)
    });

    Ok(warp::reply::with_status(warp::reply::html(body), code))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use weather_core::WeatherReading;

    #[derive(Debug, Default)]
    struct StubProvider {
        readings: HashMap<String, WeatherReading>,
        calls: AtomicUsize,
    }

    impl StubProvider {
        fn with(mut self, city: &str, temperature: f64) -> Self {
            self.readings.insert(
                city.to_string(),
                WeatherReading {
                    description: "clear sky".to_string(),
                    icon: "01d".to_string(),
                    temperature,
                    humidity_pct: 40,
                    wind_speed: 3.1,
                    sunrise: 1_700_000_000,
                    sunset: 1_700_040_000,
                },
            );
            self
        }
    }

    #[async_trait]
    impl WeatherProvider for StubProvider {
        async fn get_weather(
            &self,
            request: &WeatherRequest,
        ) -> Result<WeatherReading, WeatherError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.readings
                .get(&request.city)
                .cloned()
                .ok_or_else(|| WeatherError::CityNotFound(request.city.clone()))
        }
    }

    fn state(provider: Arc<StubProvider>) -> AppState {
        AppState::new(provider, Arc::new(Renderer::new().unwrap()), "openweathermap.org")
    }

    async fn get(provider: Arc<StubProvider>, path: &str) -> (StatusCode, String) {
        let res = warp::test::request()
            .method("GET")
            .path(path)
            .reply(&routes(state(provider)))
            .await;
        (res.status(), String::from_utf8_lossy(res.body()).into_owned())
    }

    #[tokio::test]
    async fn home_renders_forms() {
        let (status, body) = get(Arc::new(StubProvider::default()), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains(r#"name="city1""#));
        assert!(body.contains(r#"type="date""#));
    }

    #[tokio::test]
    async fn results_renders_single_city() {
        let provider = Arc::new(StubProvider::default().with("Paris", 18.5));
        let (status, body) = get(provider.clone(), "/results?city=Paris&units=metric").await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains(r#"<span class="temp">18.5</span>"#));
        assert!(body.contains(r#"<span class="humidity">40</span>"#));
        assert!(body.contains("&deg;C"));
        assert!(body.contains("01d@2x.png"));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn results_without_units_uses_kelvin_letter() {
        let provider = Arc::new(StubProvider::default().with("Paris", 291.6));
        let (status, body) = get(provider, "/results?city=Paris").await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("&deg;K"));
    }

    #[tokio::test]
    async fn comparison_renders_differences() {
        let provider = Arc::new(StubProvider::default().with("A", 70.0).with("B", 65.0));
        let (status, body) =
            get(provider.clone(), "/comparison_results?city1=A&city2=B&units=imperial").await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains(r#"<td class="temp-difference">5.0</td>"#));
        assert!(body.contains(r#"<td class="hum-difference">0</td>"#));
        assert!(body.contains(r#"<td class="sunset-difference">0.0 hours</td>"#));
        assert!(body.contains("&deg;F"));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn missing_city_is_a_bad_request() {
        let provider = Arc::new(StubProvider::default().with("Paris", 18.5));
        let (status, body) = get(provider.clone(), "/results?units=metric").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("city"));
        assert!(!body.contains(r#"class="temp""#));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn blank_city_is_a_bad_request() {
        let (status, _) = get(Arc::new(StubProvider::default()), "/results?city=%20&units=metric").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn comparison_missing_second_city_is_a_bad_request() {
        let provider = Arc::new(StubProvider::default().with("A", 70.0));
        let (status, body) = get(provider, "/comparison_results?city1=A&units=imperial").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("city2"));
    }

    #[tokio::test]
    async fn unknown_city_fails_whole_comparison() {
        let provider = Arc::new(StubProvider::default().with("A", 70.0));
        let (status, body) =
            get(provider, "/comparison_results?city1=A&city2=Atlantis&units=metric").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("Atlantis"));
        assert!(!body.contains("temp-difference"));
    }

    #[tokio::test]
    async fn identical_requests_each_reach_the_provider() {
        let provider = Arc::new(StubProvider::default().with("Paris", 18.5));
        let filter = routes(state(provider.clone()));

        for _ in 0..2 {
            let res = warp::test::request()
                .path("/results?city=Paris&units=metric")
                .reply(&filter)
                .await;
            assert_eq!(res.status(), StatusCode::OK);
        }

        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn city_name_is_escaped() {
        let provider = Arc::new(StubProvider::default().with("<b>Bold</b>", 1.0));
        let (status, body) =
            get(provider, "/results?city=%3Cb%3EBold%3C%2Fb%3E&units=metric").await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("&lt;b&gt;Bold"));
        assert!(!body.contains("<b>Bold"));
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let (status, body) = get(Arc::new(StubProvider::default()), "/history").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("Error 404"));
    }
}
