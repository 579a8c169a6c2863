//! Prompt templates for the completion service

use eduflow_common::db::models::{DiagnosticAnswer, DiagnosticQuestion, StudySource};

pub const DIAGNOSTIC_SYSTEM: &str = "You are an expert educational assessment designer. Generate 8-10 adaptive diagnostic questions based on the provided study material.

The questions should:
- Test different cognitive levels (recall, comprehension, application, analysis)
- Cover key concepts from the material
- Be clear and specific
- Help identify knowledge gaps
- Range from basic to advanced difficulty

Return ONLY a JSON array of question strings, nothing else. Example format:
[\"Question 1?\", \"Question 2?\", \"Question 3?\"]";

pub const FEEDBACK_SYSTEM: &str = "You are a helpful learning assistant. Provide brief, constructive feedback (2-3 sentences max) on the student's answer. Be encouraging but honest about gaps. Reference the source material when relevant.";

pub const PLAN_SYSTEM: &str = "You are an expert learning designer. Create a comprehensive, scaffolded learning plan using the Macro -> Meso -> Micro framework.

MACRO level: 3-5 high-level learning objectives or knowledge domains
MESO level: For each macro objective, define 2-4 intermediate skills/concepts
MICRO level: For each meso step, break down into 3-6 specific, actionable learning tasks (5-20 min each)

Return ONLY valid JSON with this exact structure:
{
  \"macro\": [
    {\"id\": \"m1\", \"title\": \"...\", \"description\": \"...\", \"order\": 0}
  ],
  \"meso\": [
    {\"id\": \"me1\", \"macroId\": \"m1\", \"title\": \"...\", \"description\": \"...\", \"order\": 0}
  ],
  \"micro\": [
    {\"id\": \"mi1\", \"mesoId\": \"me1\", \"title\": \"...\", \"description\": \"...\", \"estimatedMinutes\": 10, \"order\": 0}
  ]
}";

pub fn diagnostic_user(source: &StudySource) -> String {
    format!(
        "Study material title: {}\n\nContent:\n{}",
        source.title, source.raw_text
    )
}

pub fn feedback_user(source: &StudySource, question: &str, answer: &str) -> String {
    format!(
        "Study Material: \"{}\"\n\nQuestion: {}\n\nStudent Answer: {}\n\nProvide feedback:",
        source.title, question, answer
    )
}

/// One `Q/A/Feedback` block per question, in order
pub fn diagnostic_results(pairs: &[(DiagnosticQuestion, Option<DiagnosticAnswer>)]) -> String {
    pairs
        .iter()
        .enumerate()
        .map(|(i, (question, answer))| {
            let n = i + 1;
            format!(
                "Q{n}: {}\nA{n}: {}\nFeedback: {}",
                question.question,
                answer.as_ref().map_or("No answer", |a| a.user_answer.as_str()),
                answer.as_ref().map_or("N/A", |a| a.ai_feedback.as_str()),
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn plan_user(source: &StudySource, results: &str) -> String {
    format!(
        "Study Material: \"{}\"\n\nContent:\n{}\n\nDiagnostic Results:\n{}\n\nCreate a personalized learning plan:",
        source.title, source.raw_text, results
    )
}
