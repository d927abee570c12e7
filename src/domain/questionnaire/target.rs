//! Expansion of declared targets into concrete respondent identities

use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use tracing::warn;

use super::model::Questionnaire;
use crate::domain::chat::{ChatError, GroupMembership};

/// A group whose members could not be listed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupResolutionError {
    pub group_id: String,
    pub reason: ChatError,
}

/// Best-effort expansion result: every identity that could be resolved plus
/// the groups that could not
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetExpansion {
    pub identities: BTreeSet<String>,
    pub failures: Vec<GroupResolutionError>,
}

impl TargetExpansion {
    pub fn failed_groups(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.group_id.as_str()).collect()
    }
}

/// Expands user and group targets of `questionnaire`.
///
/// Each group lookup gets `timeout`; a timeout is recorded like any other
/// lookup failure and the remaining groups are still expanded.
pub async fn expand_targets(
    questionnaire: &Questionnaire,
    groups: &dyn GroupMembership,
    timeout: Duration,
) -> TargetExpansion {
    let mut expansion = TargetExpansion {
        identities: questionnaire.target_users().map(String::from).collect(),
        failures: Vec::new(),
    };

    let group_ids: BTreeSet<&str> = questionnaire.target_groups().collect();
    for group_id in group_ids {
        match lookup_members(groups, group_id, timeout).await {
            Ok(members) => expansion.identities.extend(members),
            Err(reason) => {
                warn!(group_id, error = %reason, "group target could not be expanded");
                expansion.failures.push(GroupResolutionError {
                    group_id: group_id.to_string(),
                    reason,
                });
            }
        }
    }

    expansion
}

async fn lookup_members(
    groups: &dyn GroupMembership,
    group_id: &str,
    timeout: Duration,
) -> Result<Vec<String>, ChatError> {
    tokio::time::timeout(timeout, groups.members(group_id))
        .await
        .unwrap_or(Err(ChatError::LookupTimeout))
}

/// Answers "is this identity targeted?" across many questionnaires,
/// looking each group up at most once.
///
/// A group that cannot be listed counts as having no members.
pub struct TargetResolver<'a> {
    groups: &'a dyn GroupMembership,
    timeout: Duration,
    members: HashMap<String, BTreeSet<String>>,
}

impl<'a> TargetResolver<'a> {
    pub fn new(groups: &'a dyn GroupMembership, timeout: Duration) -> Self {
        Self {
            groups,
            timeout,
            members: HashMap::new(),
        }
    }

    async fn group(&mut self, group_id: &str) -> &BTreeSet<String> {
        if !self.members.contains_key(group_id) {
            let members = match lookup_members(self.groups, group_id, self.timeout).await {
                Ok(members) => members.into_iter().collect(),
                Err(error) => {
                    warn!(group_id, %error, "group target could not be expanded");
                    BTreeSet::new()
                }
            };
            self.members.insert(group_id.to_string(), members);
        }
        &self.members[group_id]
    }

    pub async fn is_targeted(&mut self, questionnaire: &Questionnaire, identity: &str) -> bool {
        if questionnaire.target_users().any(|user| user == identity) {
            return true;
        }
        for group_id in questionnaire.target_groups() {
            if self.group(group_id).await.contains(identity) {
                return true;
            }
        }
        false
    }

    /// Every identity the questionnaire targets
    pub async fn identities(&mut self, questionnaire: &Questionnaire) -> BTreeSet<String> {
        let mut identities: BTreeSet<String> =
            questionnaire.target_users().map(String::from).collect();
        for group_id in questionnaire.target_groups() {
            identities.extend(self.group(group_id).await.iter().cloned());
        }
        identities
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::questionnaire::model::{
        QuestionnaireRecord, QuestionnaireSettings, ResShareType, ResubmissionPolicy, Target,
    };
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::collections::HashMap;

    struct StubGroups {
        members: HashMap<&'static str, Vec<&'static str>>,
    }

    #[async_trait]
    impl GroupMembership for StubGroups {
        async fn members(&self, group_id: &str) -> Result<Vec<String>, ChatError> {
            match group_id {
                "slow" => {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(vec![])
                }
                _ => self
                    .members
                    .get(group_id)
                    .map(|m| m.iter().map(|s| s.to_string()).collect())
                    .ok_or_else(|| ChatError::GroupNotFound(group_id.to_string())),
            }
        }
    }

    fn questionnaire(targets: Vec<Target>) -> Questionnaire {
        let at = NaiveDate::from_ymd_opt(2026, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        Questionnaire::restore(QuestionnaireRecord {
            id: 1,
            settings: QuestionnaireSettings {
                title: "설문".to_string(),
                description: String::new(),
                res_time_limit: None,
                res_shared_to: ResShareType::Public,
                is_anonymous: false,
                allow_multiple_responses: false,
                resubmission_policy: ResubmissionPolicy::default(),
                administrators: vec!["admin".to_string()],
                targets,
            },
            questions: vec![],
            created_at: at,
            modified_at: at,
            deleted_at: None,
        })
        .unwrap()
    }

    fn user(name: &str) -> Target {
        Target::User(name.to_string())
    }

    fn group(name: &str) -> Target {
        Target::Group(name.to_string())
    }

    #[tokio::test]
    async fn should_report_failed_group_without_aborting() {
        // Arrange
        let groups = StubGroups {
            members: HashMap::new(),
        };
        let questionnaire = questionnaire(vec![user("alice"), group("G1")]);

        // Act
        let expansion = expand_targets(&questionnaire, &groups, Duration::from_secs(1)).await;

        // Assert
        assert_eq!(
            expansion.identities.into_iter().collect::<Vec<_>>(),
            vec!["alice"]
        );
        assert_eq!(
            expansion.failures,
            vec![GroupResolutionError {
                group_id: "G1".to_string(),
                reason: ChatError::GroupNotFound("G1".to_string()),
            }]
        );
    }

    #[tokio::test]
    async fn should_deduplicate_direct_and_group_targets() {
        // Arrange
        let groups = StubGroups {
            members: HashMap::from([("G1", vec!["bob", "carol"]), ("G2", vec!["carol"])]),
        };
        let questionnaire =
            questionnaire(vec![user("bob"), group("G1"), group("G2"), group("G1")]);

        // Act
        let expansion = expand_targets(&questionnaire, &groups, Duration::from_secs(1)).await;

        // Assert
        assert_eq!(
            expansion.identities.into_iter().collect::<Vec<_>>(),
            vec!["bob", "carol"]
        );
        assert!(expansion.failures.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn should_treat_timeout_as_group_failure() {
        let groups = StubGroups {
            members: HashMap::from([("G1", vec!["bob"])]),
        };
        let questionnaire = questionnaire(vec![group("slow"), group("G1")]);

        let expansion = expand_targets(&questionnaire, &groups, Duration::from_millis(100)).await;

        assert_eq!(
            expansion.identities.clone().into_iter().collect::<Vec<_>>(),
            vec!["bob"]
        );
        assert_eq!(expansion.failed_groups(), vec!["slow"]);
        assert_eq!(expansion.failures[0].reason, ChatError::LookupTimeout);
    }

    #[tokio::test]
    async fn should_look_each_group_up_once() {
        // Arrange
        let groups = StubGroups {
            members: HashMap::from([("G1", vec!["bob", "carol"])]),
        };
        let first = questionnaire(vec![group("G1"), group("missing")]);
        let second = questionnaire(vec![user("dave"), group("G1")]);
        let mut resolver = TargetResolver::new(&groups, Duration::from_secs(1));

        // Act
        let bob_first = resolver.is_targeted(&first, "bob").await;
        let dave_first = resolver.is_targeted(&first, "dave").await;
        let identities = resolver.identities(&second).await;

        // Assert
        assert!(bob_first);
        assert!(!dave_first);
        assert_eq!(
            identities.into_iter().collect::<Vec<_>>(),
            vec!["bob", "carol", "dave"]
        );
        assert_eq!(resolver.members.len(), 2);
    }
}
