//! Onboarding Questionnaire
//!
//! Steps through the question list for a user or therapist. An option must
//! be picked before advancing; each answer is submitted as its step is left.

use thiserror::Error;

use crate::api::{ApiClient, ApiError};
use crate::model::{Answer, ParticipantRef, Question};
use crate::validation::ValidationError;

#[derive(Error, Debug)]
pub enum QuestionnaireError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Failed to save answer: {0}")]
    Api(#[from] ApiError),
}

/// Where the flow went after `advance`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Next(usize),
    Complete,
}

pub struct Questionnaire {
    api: ApiClient,
    owner: ParticipantRef,
    questions: Vec<Question>,
    step: usize,
    selected: Option<usize>,
    answers: Vec<Answer>,
}

impl Questionnaire {
    /// Fetch the questions for `owner`'s kind
    pub async fn load(api: ApiClient, owner: ParticipantRef) -> Result<Self, ApiError> {
        let questions = api.questions(owner.kind).await?;
        tracing::debug!(count = questions.len(), kind = %owner.kind, "Loaded questionnaire");
        Ok(Self::with_questions(api, owner, questions))
    }

    pub fn with_questions(api: ApiClient, owner: ParticipantRef, questions: Vec<Question>) -> Self {
        Self {
            api,
            owner,
            questions,
            step: 0,
            selected: None,
            answers: Vec::new(),
        }
    }

    pub fn current(&self) -> Option<&Question> {
        self.questions.get(self.step)
    }

    /// (1-based step, total)
    pub fn progress(&self) -> (usize, usize) {
        ((self.step + 1).min(self.questions.len()), self.questions.len())
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn answers(&self) -> &[Answer] {
        &self.answers
    }

    pub fn is_complete(&self) -> bool {
        self.step >= self.questions.len()
    }

    pub fn select(&mut self, option: usize) -> Result<(), ValidationError> {
        let question = self.current().ok_or(ValidationError::UnknownOption(option))?;
        if option >= question.options.len() {
            return Err(ValidationError::UnknownOption(option));
        }
        self.selected = Some(option);
        Ok(())
    }

    /// Submit the selected answer and move on.
    ///
    /// Nothing is sent when no option is selected. A failed submit leaves
    /// the step and selection in place.
    pub async fn advance(&mut self) -> Result<Step, QuestionnaireError> {
        if self.is_complete() {
            return Ok(Step::Complete);
        }
        let question = &self.questions[self.step];
        let option = self.selected.ok_or(ValidationError::NoAnswerSelected)?;

        let answer = Answer {
            owner_id: self.owner.id.clone(),
            question_id: question.id.clone(),
            answer: question.options[option].clone(),
        };
        self.api.submit_answer(self.owner.kind, &answer).await?;

        self.answers.push(answer);
        self.step += 1;
        self.selected = None;

        if self.is_complete() {
            tracing::info!(owner_id = %self.owner.id, "Questionnaire complete");
            Ok(Step::Complete)
        } else {
            Ok(Step::Next(self.step))
        }
    }
}
