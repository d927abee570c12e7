//! 설문 API 통합 테스트
//!
//! 테스트 대상:
//! - GET /health, GET /api/users/me
//! - POST/GET /api/questionnaires (정렬, 검색, 페이지), GET/PATCH/DELETE /api/questionnaires/{id}
//! - GET /api/questionnaires/{id}/targets, GET /api/questionnaires/{id}/results

mod common;

use axum::{body::Body, http::Request};
use common::{request, TestApp, FUTURE};
use serde_json::{json, Value};

fn lunch_survey(title: &str) -> Value {
    json!({
        "title": title,
        "description": "점심 메뉴 투표",
        "resTimeLimit": FUTURE,
        "resSharedTo": "RESPONDENTS",
        "administrators": ["admin"],
        "targets": [
            { "kind": "USER", "id": "alice" },
            { "kind": "GROUP", "id": "backend" }
        ],
        "questions": [
            {
                "pageNum": 1,
                "questionNum": 1,
                "questionType": "SINGLE_CHOICE",
                "body": "오늘 점심은?",
                "isRequired": true,
                "options": ["김밥", "라멘"]
            },
            {
                "pageNum": 1,
                "questionNum": 2,
                "questionType": "TEXT",
                "body": "한 줄 의견",
                "validation": { "maxBound": "20" }
            }
        ]
    })
}

fn ids_of(items: &[Value]) -> Vec<i64> {
    items
        .iter()
        .map(|i| i["questionnaireId"].as_i64().unwrap())
        .collect()
}

// ============== 공통 ==============

#[tokio::test]
async fn should_answer_health_check() {
    let app = TestApp::new();

    let (status, _) = app.call(request("GET", "/health", None, None)).await;

    assert_eq!(status, 200);
}

#[tokio::test]
async fn should_resolve_caller_identity() {
    let app = TestApp::new();

    let (status, body) = app.get("/api/users/me", "alice").await;

    assert_eq!(status, 200);
    assert_eq!(body["result"]["userId"], "alice");
}

#[tokio::test]
async fn should_reject_missing_or_invalid_credential() {
    let app = TestApp::new();

    let (missing, body) = app
        .call(request("GET", "/api/users/me", None, None))
        .await;
    let (invalid, _) = app.get("/api/users/me", "invalid").await;

    assert_eq!(missing, 401);
    assert_eq!(body["isSuccess"], false);
    assert_eq!(invalid, 401);
}

// ============== 생성 ==============

#[tokio::test]
async fn should_create_questionnaire_and_announce_it() {
    // Arrange
    let app = TestApp::new();

    // Act
    let (status, body) = app
        .send_json("POST", "/api/questionnaires", "carol", lunch_survey("점심 투표"))
        .await;

    // Assert
    assert_eq!(status, 200, "{}", body);
    let result = &body["result"];
    assert_eq!(result["administrators"], json!(["admin", "carol"]));
    assert_eq!(result["questions"][0]["options"][1]["optionNum"], 2);
    assert_eq!(result["questions"][1]["validation"]["maxBound"], "20");
    assert_eq!(result["isOpen"], true);
    assert_eq!(result["resubmissionPolicy"], "PRESERVE_SUBMITTED_AT");

    let messages = app.notifier.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("점심 투표"));
    assert!(messages[0].contains("@alice @backend"));
}

#[tokio::test]
async fn should_reject_deadline_in_the_past() {
    let app = TestApp::new();
    let mut survey = lunch_survey("지난 설문");
    survey["resTimeLimit"] = json!("2000-01-01T00:00:00");

    let (status, body) = app
        .send_json("POST", "/api/questionnaires", "admin", survey)
        .await;

    assert_eq!(status, 400);
    assert_eq!(body["code"], "COMMON400");
}

#[tokio::test]
async fn should_reject_broken_question_definitions() {
    // Arrange
    let app = TestApp::new();
    let mut duplicate_ordinal = lunch_survey("중복");
    duplicate_ordinal["questions"][1]["questionNum"] = json!(1);
    let mut bad_regex = lunch_survey("정규식");
    bad_regex["questions"][1]["validation"] = json!({ "regexPattern": "([a-z" });
    let mut options_on_text = lunch_survey("타입");
    options_on_text["questions"][1]["options"] = json!(["A"]);
    let mut blank_title = lunch_survey("");
    blank_title["title"] = json!("");

    // Act & Assert
    for survey in [duplicate_ordinal, bad_regex, options_on_text, blank_title] {
        let (status, body) = app
            .send_json("POST", "/api/questionnaires", "admin", survey)
            .await;
        assert_eq!(status, 400, "{}", body);
    }
    assert!(app.notifier.messages().is_empty());
}

#[tokio::test]
async fn should_wrap_malformed_body_in_error_envelope() {
    let app = TestApp::new();
    let malformed = Request::builder()
        .method("POST")
        .uri("/api/questionnaires")
        .header("Authorization", "Bearer admin")
        .header("Content-Type", "application/json")
        .body(Body::from("{\"title\": "))
        .unwrap();

    let (status, body) = app.call(malformed).await;

    assert_eq!(status, 400);
    assert_eq!(body["code"], "COMMON400");
    assert_eq!(body["isSuccess"], false);
}

// ============== 조회/수정/삭제 ==============

#[tokio::test]
async fn should_list_newest_first_with_admin_flag() {
    let app = TestApp::new();
    let first = app.create_questionnaire("admin", lunch_survey("첫 번째")).await;
    let second = app.create_questionnaire("dave", lunch_survey("두 번째")).await;

    let (status, body) = app.get("/api/questionnaires", "dave").await;

    assert_eq!(status, 200);
    assert_eq!(body["result"]["pageMax"], 1);
    let items = body["result"]["questionnaires"].as_array().unwrap();
    assert_eq!(ids_of(items), vec![second, first]);
    assert_eq!(items[0]["isAdministrator"], true);
    assert_eq!(items[1]["isAdministrator"], false);
}

#[tokio::test]
async fn should_search_titles_and_sort_by_title() {
    // Arrange
    let app = TestApp::new();
    let lunch = app.create_questionnaire("admin", lunch_survey("Lunch 투표")).await;
    app.create_questionnaire("admin", lunch_survey("회고")).await;
    let brunch = app.create_questionnaire("admin", lunch_survey("brunch 투표")).await;

    // Act
    let (status, body) = app
        .get("/api/questionnaires?search=lunch&sort=title", "admin")
        .await;
    let (broken, broken_body) = app.get("/api/questionnaires?search=(", "admin").await;
    let (unknown_sort, _) = app.get("/api/questionnaires?sort=deadline", "admin").await;

    // Assert
    assert_eq!(status, 200, "{}", body);
    let items = body["result"]["questionnaires"].as_array().unwrap();
    assert_eq!(ids_of(items), vec![lunch, brunch]);
    assert_eq!(broken, 400);
    assert_eq!(broken_body["code"], "COMMON400");
    assert_eq!(unknown_sort, 400);
}

#[tokio::test]
async fn should_page_twenty_at_a_time() {
    // Arrange
    let app = TestApp::new();
    let mut ids = Vec::new();
    for n in 0..21 {
        ids.push(app.create_questionnaire("admin", lunch_survey(&format!("설문 {}", n))).await);
    }

    // Act
    let (_, first) = app.get("/api/questionnaires?page=1", "admin").await;
    let (_, second) = app.get("/api/questionnaires?page=2", "admin").await;
    let (too_far, _) = app.get("/api/questionnaires?page=3", "admin").await;
    let (zero, _) = app.get("/api/questionnaires?page=0", "admin").await;

    // Assert
    assert_eq!(first["result"]["pageMax"], 2);
    assert_eq!(
        first["result"]["questionnaires"].as_array().unwrap().len(),
        20
    );
    assert_eq!(
        ids_of(second["result"]["questionnaires"].as_array().unwrap()),
        vec![ids[0]]
    );
    assert_eq!(too_far, 400);
    assert_eq!(zero, 400);
}

#[tokio::test]
async fn should_leave_out_targeted_questionnaires_on_request() {
    // Arrange
    let app = TestApp::new();
    let targeted = app.create_questionnaire("admin", lunch_survey("대상")).await;
    let mut other = lunch_survey("비대상");
    other["targets"] = json!([{ "kind": "USER", "id": "dave" }]);
    let untargeted = app.create_questionnaire("admin", other).await;

    // Act
    let (_, all) = app.get("/api/questionnaires", "bob").await;
    let (_, rest) = app
        .get("/api/questionnaires?nontargeted=true", "bob")
        .await;

    // Assert
    let all = all["result"]["questionnaires"].as_array().unwrap();
    assert_eq!(ids_of(all), vec![untargeted, targeted]);
    assert_eq!(all[0]["isTargeted"], false);
    assert_eq!(all[1]["isTargeted"], true);
    assert_eq!(
        ids_of(rest["result"]["questionnaires"].as_array().unwrap()),
        vec![untargeted]
    );
}

#[tokio::test]
async fn should_only_let_administrators_edit() {
    // Arrange
    let app = TestApp::new();
    let id = app.create_questionnaire("admin", lunch_survey("점심")).await;
    let old_question = app.question_id(id, 0).await;
    let mut edited = lunch_survey("저녁");
    edited["questions"] = json!([{
        "pageNum": 1,
        "questionNum": 1,
        "questionType": "NUMBER",
        "body": "몇 명?",
        "validation": { "minBound": "1", "maxBound": "10" }
    }]);
    let uri = format!("/api/questionnaires/{}", id);

    // Act
    let (forbidden, _) = app.send_json("PATCH", &uri, "mallory", edited.clone()).await;
    let (status, body) = app.send_json("PATCH", &uri, "admin", edited).await;

    // Assert
    assert_eq!(forbidden, 403);
    assert_eq!(status, 200, "{}", body);
    assert_eq!(body["result"]["title"], "저녁");
    let questions = body["result"]["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 1);
    assert_eq!(questions[0]["questionType"], "NUMBER");
    assert_ne!(questions[0]["questionId"].as_i64().unwrap(), old_question);
}

#[tokio::test]
async fn should_hide_deleted_questionnaire() {
    let app = TestApp::new();
    let id = app.create_questionnaire("admin", lunch_survey("삭제 예정")).await;
    let uri = format!("/api/questionnaires/{}", id);

    let (forbidden, _) = app.delete(&uri, "mallory").await;
    let (deleted, _) = app.delete(&uri, "admin").await;
    let (after_get, _) = app.get(&uri, "admin").await;
    let (after_delete, _) = app.delete(&uri, "admin").await;
    let (_, list) = app.get("/api/questionnaires", "admin").await;

    assert_eq!(forbidden, 403);
    assert_eq!(deleted, 200);
    assert_eq!(after_get, 404);
    assert_eq!(after_delete, 404);
    assert_eq!(list["result"], json!({ "pageMax": 0, "questionnaires": [] }));
}

// ============== 대상/결과 ==============

#[tokio::test]
async fn should_expand_targets_and_report_failed_groups() {
    // Arrange
    let app = TestApp::new();
    let mut survey = lunch_survey("대상");
    survey["targets"] = json!([
        { "kind": "USER", "id": "bob" },
        { "kind": "GROUP", "id": "backend" },
        { "kind": "GROUP", "id": "ghosts" }
    ]);
    let id = app.create_questionnaire("admin", survey).await;
    let uri = format!("/api/questionnaires/{}/targets", id);

    // Act
    let (forbidden, _) = app.get(&uri, "bob").await;
    let (status, body) = app.get(&uri, "admin").await;

    // Assert
    assert_eq!(forbidden, 403);
    assert_eq!(status, 200);
    assert_eq!(body["result"]["identities"], json!(["bob", "carol"]));
    assert_eq!(body["result"]["failedGroups"][0]["groupId"], "ghosts");
}

#[tokio::test]
async fn should_share_results_with_respondents_only() {
    // Arrange
    let app = TestApp::new();
    let id = app.create_questionnaire("admin", lunch_survey("공개 범위")).await;
    let question = app.question_id(id, 0).await;
    let results = format!("/api/questionnaires/{}/results", id);

    // Act
    let (before, _) = app.get(&results, "alice").await;
    let (submitted, _) = app
        .send_json(
            "POST",
            &format!("/api/questionnaires/{}/responses", id),
            "alice",
            json!({ "answers": [{ "questionId": question, "body": "라멘" }] }),
        )
        .await;
    let (after, body) = app.get(&results, "alice").await;
    let (admin, _) = app.get(&results, "admin").await;

    // Assert
    assert_eq!(before, 403);
    assert_eq!(submitted, 200);
    assert_eq!(after, 200);
    assert_eq!(admin, 200);
    let options = &body["result"]["questions"][0]["summary"]["options"];
    assert_eq!(body["result"]["questions"][0]["summary"]["type"], "choice");
    assert_eq!(options[0]["count"], 0);
    assert_eq!(options[1]["count"], 1);
}
