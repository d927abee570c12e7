pub mod config;
pub mod domain;
pub mod global;
pub mod state;
pub mod store;
pub mod utils;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::domain::{questionnaire, response, user};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        user::handler::get_me,
        user::handler::list_my_targeted,
        user::handler::list_user_targeted,
        user::handler::list_my_administrated,
        user::handler::list_my_responses_to,
        questionnaire::handler::create_questionnaire,
        questionnaire::handler::list_questionnaires,
        questionnaire::handler::get_questionnaire,
        questionnaire::handler::update_questionnaire,
        questionnaire::handler::delete_questionnaire,
        questionnaire::handler::get_results,
        questionnaire::handler::get_targets,
        response::handler::submit_response,
        response::handler::list_my_responses,
        response::handler::get_response,
        response::handler::withdraw_response,
    ),
    components(
        schemas(
            user::dto::MeResponse,
            user::dto::SuccessMeResponse,
            user::dto::TargetedQuestionnaireItem,
            user::dto::SuccessTargetedListResponse,
            user::dto::AdministratedQuestionnaireItem,
            user::dto::SuccessAdministratedListResponse,
            questionnaire::entity::question::QuestionType,
            questionnaire::entity::questionnaire::ResShareType,
            questionnaire::entity::questionnaire::ResubmissionPolicy,
            questionnaire::entity::target::TargetKind,
            questionnaire::model::ScaleLabel,
            questionnaire::model::ValidationRule,
            questionnaire::dto::TargetItem,
            questionnaire::dto::QuestionItem,
            questionnaire::dto::QuestionnaireRequest,
            questionnaire::dto::OptionItem,
            questionnaire::dto::QuestionDetail,
            questionnaire::dto::QuestionnaireDetail,
            questionnaire::dto::SuccessQuestionnaireDetailResponse,
            questionnaire::model::QuestionnaireSort,
            questionnaire::dto::QuestionnaireListItem,
            questionnaire::dto::QuestionnairePage,
            questionnaire::dto::SuccessQuestionnairePageResponse,
            questionnaire::dto::FailedGroup,
            questionnaire::dto::TargetsResponse,
            questionnaire::dto::SuccessTargetsResponse,
            questionnaire::dto::SuccessEmptyResponse,
            response::dto::AnswerItem,
            response::dto::SubmitResponseRequest,
            response::dto::ResponseDetail,
            response::dto::SuccessResponseDetailResponse,
            response::dto::MyResponseItem,
            response::dto::SuccessMyResponseListResponse,
            response::result::OptionCount,
            response::result::QuestionSummary,
            response::result::QuestionResult,
            response::result::QuestionnaireResult,
            utils::response::ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "User", description = "사용자 API"),
        (name = "Questionnaire", description = "설문 API"),
        (name = "Response", description = "응답 API")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

pub fn app(state: AppState) -> Router {
    let questionnaires = Router::new()
        .route(
            "/",
            get(questionnaire::handler::list_questionnaires)
                .post(questionnaire::handler::create_questionnaire),
        )
        .route(
            "/:questionnaire_id",
            get(questionnaire::handler::get_questionnaire)
                .patch(questionnaire::handler::update_questionnaire)
                .delete(questionnaire::handler::delete_questionnaire),
        )
        .route(
            "/:questionnaire_id/results",
            get(questionnaire::handler::get_results),
        )
        .route(
            "/:questionnaire_id/targets",
            get(questionnaire::handler::get_targets),
        )
        .route(
            "/:questionnaire_id/responses",
            post(response::handler::submit_response),
        );

    let responses = Router::new()
        .route("/me", get(response::handler::list_my_responses))
        .route(
            "/:response_id",
            get(response::handler::get_response).delete(response::handler::withdraw_response),
        );

    let users = Router::new()
        .route("/me", get(user::handler::get_me))
        .route("/me/targeted", get(user::handler::list_my_targeted))
        .route("/me/administrates", get(user::handler::list_my_administrated))
        .route(
            "/me/responses/:questionnaire_id",
            get(user::handler::list_my_responses_to),
        )
        .route("/:user_id/targeted", get(user::handler::list_user_targeted));

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(|| async { "OK" }))
        .nest("/api/users", users)
        .nest("/api/questionnaires", questionnaires)
        .nest("/api/responses", responses)
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(global::middleware::request_id_middleware))
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
