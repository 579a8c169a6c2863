//! SeaORM entity models
//!
//! Database entities for EduFlow

mod user;
mod study_source;
mod diagnostic_question;
mod diagnostic_answer;
mod study_plan;
mod review;

pub use user::{
    Entity as UserEntity,
    Model as User,
    ActiveModel as UserActiveModel,
    Column as UserColumn,
};

pub use study_source::{
    Entity as StudySourceEntity,
    Model as StudySource,
    ActiveModel as StudySourceActiveModel,
    Column as StudySourceColumn,
};

pub use diagnostic_question::{
    Entity as QuestionEntity,
    Model as DiagnosticQuestion,
    ActiveModel as QuestionActiveModel,
    Column as QuestionColumn,
};

pub use diagnostic_answer::{
    Entity as AnswerEntity,
    Model as DiagnosticAnswer,
    ActiveModel as AnswerActiveModel,
    Column as AnswerColumn,
};

pub use study_plan::{
    Entity as StudyPlanEntity,
    Model as StudyPlan,
    ActiveModel as StudyPlanActiveModel,
    Column as StudyPlanColumn,
};

pub use review::{
    Entity as ReviewEntity,
    Model as Review,
    ActiveModel as ReviewActiveModel,
    Column as ReviewColumn,
};
