//! Chat message bodies (markdown)

use chrono::NaiveDateTime;

use crate::domain::questionnaire::model::{Questionnaire, Target};

const NONE_TEXT: &str = "none";

fn deadline_text(limit: Option<NaiveDateTime>) -> String {
    limit
        .map(|t| t.format("%Y/%m/%d %H:%M").to_string())
        .unwrap_or_else(|| NONE_TEXT.to_string())
}

fn mentions(targets: &[Target]) -> String {
    if targets.is_empty() {
        return NONE_TEXT.to_string();
    }
    targets
        .iter()
        .map(|t| match t {
            Target::User(name) | Target::Group(name) => format!("@{}", name),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Announcement posted when a questionnaire is created
pub fn questionnaire_created_message(questionnaire: &Questionnaire, app_base_url: &str) -> String {
    let settings = &questionnaire.settings;
    format!(
        "### Questionnaire [{title}]({base}/questionnaires/{id}) was created\n\
         #### Administrators\n\
         {admins}\n\
         #### Description\n\
         {description}\n\
         #### Deadline\n\
         {deadline}\n\
         #### Targets\n\
         {targets}\n\
         #### Answer here\n\
         {base}/responses/new/{id}",
        title = settings.title,
        base = app_base_url,
        id = questionnaire.id,
        admins = settings.administrators.join(","),
        description = settings.description,
        deadline = deadline_text(settings.res_time_limit),
        targets = mentions(&settings.targets),
    )
}

/// Notice posted when a response is finally submitted
pub fn response_submitted_message(
    questionnaire: &Questionnaire,
    respondent: Option<&str>,
    app_base_url: &str,
) -> String {
    let who = respondent.unwrap_or("An anonymous respondent");
    format!(
        "{who} answered [{title}]({base}/questionnaires/{id})",
        who = who,
        title = questionnaire.settings.title,
        base = app_base_url,
        id = questionnaire.id,
    )
}

/// Deadline reminder addressed to targets who have not answered yet
pub fn deadline_reminder_message(
    questionnaire: &Questionnaire,
    remaining: &str,
    pending: &[String],
    app_base_url: &str,
) -> String {
    let settings = &questionnaire.settings;
    let mentions = pending
        .iter()
        .map(|identity| format!("@{}", identity))
        .collect::<Vec<_>>()
        .join(" ");
    format!(
        "### Questionnaire [{title}]({base}/questionnaires/{id}) closes soon\n\
         ==**{remaining} left**==\n\
         #### Administrators\n\
         {admins}\n\
         #### Description\n\
         {description}\n\
         #### Deadline\n\
         {deadline}\n\
         #### Not answered yet\n\
         {mentions}\n\
         #### Answer here\n\
         {base}/responses/new/{id}",
        title = settings.title,
        base = app_base_url,
        id = questionnaire.id,
        remaining = remaining,
        admins = settings.administrators.join(","),
        description = settings.description,
        deadline = deadline_text(settings.res_time_limit),
        mentions = mentions,
    )
}
