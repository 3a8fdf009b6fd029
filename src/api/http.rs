use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::api::wire::{
    Envelope, WireErrorBody, WireLeaderboardEntry, WireScheduleItem, WireSubmitData,
    WireTestResult,
};
use crate::api::{ApiError, TestApi};
use crate::config::Config;
use crate::model::{
    LeaderboardEntry, Schedule, ScheduleSummary, SubmitRequest, SubmitResponse, TestResult, Week,
};

/// The duplicate-completion signal is carried in the error message body,
/// not a dedicated status code.
const ALREADY_COMPLETED_MESSAGE: &str = "You have already completed this test";

/// `TestApi` over HTTP with bearer-token auth.
pub struct HttpApi {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpApi {
    pub fn new(config: &Config, token: impl Into<String>) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Ok(Self {
            client,
            base_url: config.backend_url.trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let response = self
            .client
            .get(self.url(path))
            .bearer_auth(&self.token)
            .query(query)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status(status.as_u16()));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}

#[async_trait]
impl TestApi for HttpApi {
    async fn fetch_active_schedules(&self) -> Result<Vec<ScheduleSummary>, ApiError> {
        let items: Vec<WireScheduleItem> = self.get_json("/api/weeks/active", &[]).await?;
        Ok(items.iter().map(ScheduleSummary::from).collect())
    }

    async fn fetch_schedule_for(
        &self,
        subject_id: &str,
        week: Week,
    ) -> Result<Option<Schedule>, ApiError> {
        let items: Vec<WireScheduleItem> = self
            .get_json(
                "/api/weeks/active",
                &[
                    ("subjectId", subject_id.to_string()),
                    ("weekNumber", week.number.to_string()),
                    ("year", week.year.to_string()),
                ],
            )
            .await?;

        // The endpoint may answer broader than the query; pick the exact
        // active match or report absence.
        let schedule = items
            .into_iter()
            .find(|item| {
                item.is_active
                    && item.subject.id() == subject_id
                    && item.week_number == week.number
                    && item.year == week.year
            })
            .map(Schedule::from);
        Ok(schedule)
    }

    async fn submit_result(&self, request: &SubmitRequest) -> Result<SubmitResponse, ApiError> {
        let body = json!({
            "studentId": request.student_id,
            "weekScheduleId": request.week_schedule_id,
            "subjectId": request.subject_id,
            "weekNumber": request.week_number,
            "year": request.year,
            "score": request.score,
            "totalQuestions": request.total_questions,
            "answers": request.answers.iter().map(|a| json!({
                "questionId": a.question_id,
                "selectedAnswer": a.selected_answer,
                "isCorrect": a.is_correct,
            })).collect::<Vec<_>>(),
            "pointsGain": request.points_gain,
        });

        let response = self
            .client
            .post(self.url("/api/weekly-test/results"))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.json::<WireErrorBody>().await.unwrap_or(WireErrorBody {
                message: None,
            });
            if error_body.message.as_deref() == Some(ALREADY_COMPLETED_MESSAGE) {
                return Err(ApiError::AlreadyCompleted);
            }
            return Err(ApiError::Status(status.as_u16()));
        }

        let envelope = response
            .json::<Envelope<WireSubmitData>>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        match envelope.data {
            Some(data) if envelope.success => Ok(SubmitResponse {
                test_result: data.test_result.into(),
                points_earned: data.points_earned,
                total_points: data.total_points,
            }),
            _ => Err(ApiError::Decode(
                envelope
                    .message
                    .unwrap_or_else(|| "server returned an error".to_string()),
            )),
        }
    }

    async fn fetch_result(
        &self,
        student_id: &str,
        schedule_id: &str,
    ) -> Result<Option<TestResult>, ApiError> {
        let response = self
            .client
            .get(self.url(&format!("/api/weekly-test/results/{student_id}")))
            .bearer_auth(&self.token)
            .query(&[("weekScheduleId", schedule_id)])
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 404 {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(ApiError::Status(status.as_u16()));
        }

        let envelope = response
            .json::<Envelope<WireTestResult>>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        Ok(envelope
            .data
            .filter(|_| envelope.success)
            .map(TestResult::from))
    }

    async fn fetch_leaderboard(
        &self,
        subject_id: &str,
        week: Week,
    ) -> Result<Vec<LeaderboardEntry>, ApiError> {
        let envelope: Envelope<Vec<WireLeaderboardEntry>> = self
            .get_json(
                "/api/weeklytest/leaderboard",
                &[
                    ("subjectId", subject_id.to_string()),
                    ("year", week.year.to_string()),
                    ("weekNumber", week.number.to_string()),
                ],
            )
            .await?;
        match envelope.data {
            Some(entries) if envelope.success => {
                Ok(entries.into_iter().map(LeaderboardEntry::from).collect())
            }
            _ => Err(ApiError::Decode(
                envelope
                    .message
                    .unwrap_or_else(|| "leaderboard unavailable".to_string()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let config = Config {
            backend_url: "http://lab.example/".to_string(),
            ..Config::default()
        };
        let api = HttpApi::new(&config, "token").unwrap();
        assert_eq!(api.url("/api/weeks/active"), "http://lab.example/api/weeks/active");
    }
}
