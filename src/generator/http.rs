use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use super::decode::{decode_analysis, decode_course_plan, decode_objectives, decode_syllabus};
use super::{Generator, GeneratorError};
use crate::config::GeneratorConfig;
use crate::models::{Analysis, CoursePlan, Syllabus};
use crate::pipeline::{CoursePlanRequest, ObjectiveMap, ObjectivesRequest, SyllabusRequest};
use crate::upload::MaterialRef;

pub const ANALYZE_ENDPOINT: &str = "/analyzeMaterial";
pub const OBJECTIVES_ENDPOINT: &str = "/getLearningObjectives";
pub const SYLLABUS_ENDPOINT: &str = "/generateSyllabus";
pub const COURSE_PLAN_ENDPOINT: &str = "/generateCoursePlan";

/// HTTP client for the generation backend.
pub struct HttpGenerator {
    base_url: String,
    client: reqwest::Client,
    timeout_secs: u64,
}

/// Request body for `/analyzeMaterial`
#[derive(Serialize)]
struct AnalyzeBody<'a> {
    material: &'a str,
    #[serde(rename = "sourceType")]
    source_type: &'static str,
}

impl HttpGenerator {
    pub fn new(config: &GeneratorConfig) -> Result<Self, GeneratorError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| GeneratorError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: config.base_url.clone(),
            client,
            timeout_secs: config.timeout_secs,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST `body` as JSON and return the response body as JSON.
    ///
    /// A body that is not JSON at all is returned as a JSON string so the
    /// decoder can look for a fenced block inside it.
    async fn post<B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<Value, GeneratorError> {
        let url = format!("{}{}", self.base_url, endpoint);
        tracing::debug!(url = %url, "Generation request");

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GeneratorError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await.map_err(|e| self.map_send_error(e))?;
        Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
    }

    fn map_send_error(&self, e: reqwest::Error) -> GeneratorError {
        if e.is_connect() {
            GeneratorError::Connection(self.base_url.clone())
        } else if e.is_timeout() {
            GeneratorError::Timeout(self.timeout_secs)
        } else {
            GeneratorError::HttpClient(e.to_string())
        }
    }
}

#[async_trait]
impl Generator for HttpGenerator {
    async fn analyze_material(&self, material: &MaterialRef) -> Result<Analysis, GeneratorError> {
        let source_type = match material {
            MaterialRef::Url(_) => "url",
            MaterialRef::Stored(_) => "upload",
            MaterialRef::Text(_) => "text",
        };
        let body = AnalyzeBody {
            material: material.as_material(),
            source_type,
        };
        decode_analysis(self.post(ANALYZE_ENDPOINT, &body).await?)
    }

    async fn learning_objectives(
        &self,
        request: &ObjectivesRequest,
    ) -> Result<ObjectiveMap, GeneratorError> {
        decode_objectives(self.post(OBJECTIVES_ENDPOINT, request).await?)
    }

    async fn generate_syllabus(&self, request: &SyllabusRequest) -> Result<Syllabus, GeneratorError> {
        decode_syllabus(self.post(SYLLABUS_ENDPOINT, request).await?)
    }

    async fn generate_course_plan(
        &self,
        request: &CoursePlanRequest,
    ) -> Result<CoursePlan, GeneratorError> {
        decode_course_plan(self.post(COURSE_PLAN_ENDPOINT, request).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TopicEntry;
    use crate::pipeline::build_generation_request;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn client(base_url: &str) -> HttpGenerator {
        let config = GeneratorConfig::default()
            .with_base_url(base_url)
            .with_timeout_secs(1);
        HttpGenerator::new(&config).unwrap()
    }

    fn analysis() -> Analysis {
        Analysis {
            language: "English".into(),
            main_topics: vec![TopicEntry::new("Cells", "Units of life")],
            prompt: Some("internal".into()),
        }
    }

    #[tokio::test]
    async fn syllabus_request_body_and_response() {
        let seen: Arc<Mutex<Option<Value>>> = Arc::new(Mutex::new(None));
        let captured = seen.clone();
        let router = Router::new().route(
            SYLLABUS_ENDPOINT,
            post(move |Json(body): Json<Value>| {
                let captured = captured.clone();
                async move {
                    *captured.lock().unwrap() = Some(body);
                    Json(json!({
                        "CourseTitle": "Intro to Biology",
                        "CourseDescription": "Cells",
                        "LearningOutcomes": [],
                        "CourseGoals": [],
                        "CourseTopics": [],
                        "Prerequisites": []
                    }))
                }
            }),
        );
        let generator = client(&serve(router).await);

        let request = build_generation_request(&analysis(), 2);
        let syllabus = generator.generate_syllabus(&request).await.unwrap();
        assert_eq!(syllabus.course_title, "Intro to Biology");

        let body = seen.lock().unwrap().clone().unwrap();
        assert_eq!(body["bloomLevel"], 2);
        assert!(body["Analysis"].get("Prompt").is_none());
    }

    #[tokio::test]
    async fn string_encoded_objectives() {
        let router = Router::new().route(
            OBJECTIVES_ENDPOINT,
            post(|| async {
                Json(json!("{\\\"Remembering\\\": [\\\"Name organelles\\\"]}"))
            }),
        );
        let generator = client(&serve(router).await);
        let request = ObjectivesRequest {
            topic: "Cells".into(),
            context: "High School".into(),
            level: 0,
        };
        let map = generator.learning_objectives(&request).await.unwrap();
        assert_eq!(map["Remembering"], vec!["Name organelles"]);
    }

    #[tokio::test]
    async fn fenced_plain_text_analysis() {
        let router = Router::new().route(
            ANALYZE_ENDPOINT,
            post(|| async {
                "```json\n{\"Language\": \"Italian\", \"MainTopics\": [{\"Topic\": \"Cellule\"}]}\n```"
            }),
        );
        let generator = client(&serve(router).await);
        let material = MaterialRef::text("Le cellule").unwrap();
        let analysis = generator.analyze_material(&material).await.unwrap();
        assert_eq!(analysis.language, "Italian");
        assert_eq!(analysis.topic_names(), vec!["Cellule"]);
    }

    #[tokio::test]
    async fn non_success_status_reported() {
        let router = Router::new().route(
            SYLLABUS_ENDPOINT,
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "model overloaded") }),
        );
        let generator = client(&serve(router).await);
        let err = generator
            .generate_syllabus(&build_generation_request(&analysis(), 0))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            GeneratorError::Status {
                status: 500,
                body: "model overloaded".into()
            }
        );
        assert!(!err.is_malformed());
    }

    #[tokio::test]
    async fn unreadable_body_is_malformed() {
        let router = Router::new().route(
            COURSE_PLAN_ENDPOINT,
            post(|| async { Json(json!({"error": "nothing"})) }),
        );
        let generator = client(&serve(router).await);
        let request = CoursePlanRequest {
            analysis: analysis(),
            syllabus: Syllabus::default(),
            number_of_lessons: 4,
            lesson_duration_minutes: 45,
        };
        let err = generator.generate_course_plan(&request).await.unwrap_err();
        assert!(err.is_malformed());
    }

    #[tokio::test]
    async fn closed_port_is_connection_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let generator = client(&format!("http://{addr}"));
        let err = generator
            .analyze_material(&MaterialRef::text("x").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, GeneratorError::Connection(_)));
    }

    #[tokio::test]
    async fn slow_backend_times_out() {
        let router = Router::new().route(
            SYLLABUS_ENDPOINT,
            post(|| async {
                tokio::time::sleep(std::time::Duration::from_secs(3)).await;
                "late"
            }),
        );
        let generator = client(&serve(router).await);
        let err = generator
            .generate_syllabus(&build_generation_request(&analysis(), 0))
            .await
            .unwrap_err();
        assert_eq!(err, GeneratorError::Timeout(1));
    }
}
