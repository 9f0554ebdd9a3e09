use minijinja::Environment;
use serde::Serialize;

const TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../templates/base.html")),
    ("home.html", include_str!("../templates/home.html")),
    ("results.html", include_str!("../templates/results.html")),
    ("comparison_results.html", include_str!("../templates/comparison_results.html")),
    ("error.html", include_str!("../templates/error.html")),
];

/// Template engine with all pages compiled in. `.html` templates auto-escape.
#[derive(Debug)]
pub struct Renderer {
    env: Environment<'static>,
}

impl Renderer {
    pub fn new() -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        for &(name, source) in TEMPLATES {
            env.add_template(name, source)?;
        }
        env.add_filter("fixed", fixed);

        Ok(Self { env })
    }

    pub fn render<S: Serialize>(&self, name: &str, context: S) -> Result<String, minijinja::Error> {
        self.env.get_template(name)?.render(context)
    }
}

/// `{{ value|fixed(2) }}`: exactly `digits` decimals, so `5` renders as `5.0` with `fixed(1)`.
fn fixed(value: f64, digits: Option<usize>) -> String {
    let digits = digits.unwrap_or(0);
    format!("{value:.digits$}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone};
    use weather_core::{WeatherReading, present};

    fn reading() -> WeatherReading {
        WeatherReading {
            description: "clear sky".to_string(),
            icon: "01d".to_string(),
            temperature: 18.5,
            humidity_pct: 40,
            wind_speed: 3.1,
            sunrise: 1_700_000_000,
            sunset: 1_700_040_000,
        }
    }

    #[test]
    fn fixed_pads_and_rounds() {
        assert_eq!(fixed(5.0, Some(1)), "5.0");
        assert_eq!(fixed(-5.0, Some(0)), "-5");
        assert_eq!(fixed(6.25, Some(2)), "6.25");
        assert_eq!(fixed(3.0, None), "3");
    }

    #[test]
    fn all_templates_compile() {
        let renderer = Renderer::new().unwrap();
        for (name, _) in TEMPLATES {
            assert!(renderer.env.get_template(name).is_ok(), "{name}");
        }
    }

    #[test]
    fn home_page_shows_date_range() {
        let renderer = Renderer::new().unwrap();
        let now = Local.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        let html = renderer.render("home.html", present::home_context(now)).unwrap();

        assert!(html.contains(r#"min="2024-03-05""#));
        assert!(html.contains(r#"max="2024-03-10""#));
        assert!(html.contains(r#"action="/results""#));
        assert!(html.contains(r#"action="/comparison_results""#));
    }

    #[test]
    fn results_page_escapes_city() {
        let renderer = Renderer::new().unwrap();
        let ctx = present::results_context(Local::now(), "<i>Paris</i>", None, &reading(), "img.test")
            .unwrap();
        let html = renderer.render("results.html", ctx).unwrap();

        assert!(html.contains("&lt;i&gt;Paris"));
        assert!(!html.contains("<i>Paris"));
        assert!(html.contains("img.test"));
        assert!(html.contains("01d@2x.png"));
    }

    #[test]
    fn error_page_shows_code_and_message() {
        #[derive(Serialize)]
        struct Ctx {
            code: u16,
            message: &'static str,
        }

        let renderer = Renderer::new().unwrap();
        let html = renderer
            .render("error.html", Ctx { code: 502, message: "provider down" })
            .unwrap();
        assert!(html.contains("Error 502"));
        assert!(html.contains("provider down"));
    }
}
