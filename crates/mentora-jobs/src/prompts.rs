//! Prompt builders for the content and grading workers.

use mentora_core::ChapterContext;

/// Build the expansion prompt for one chapter of a course.
pub fn chapter_prompt(chapter: &ChapterContext) -> String {
    format!(
        r#"Expand ONE chapter for the course named "{course_title}".

Return ONLY a valid Markdown string as the final output.
- Maximum heading level is ## (no #).
- Wrap the entire content starting with ## Chapter {order_index}: {title}.
- Use semantic Markdown: ##, ###, -, 1., `inline code`, and fenced code blocks.
- Do NOT return JSON, HTML tags, or extra explanations.

Context:
- Is this chapter a study case: {is_study_case}
- Course overview: {course_description}
- Chapter order index: {order_index}
- Chapter: {title}
- Chapter summary: {description}

Content requirements (for regular chapters):
1. What (introduction to the topic)
2. Why (importance and relevance)
3. Tools/Libraries (if applicable)
4. Steps/Concepts (ordered explanation)
5. Real Example (code or case study)
6. Summary (key takeaways)

Content requirements (for study case chapters):
1. What (introduction to the study case)
2. Why (importance and relevance of the study case)
3. Tools/Libraries (if applicable)
4. Steps/Concepts (ordered explanation)

Notes:
- For a study case chapter, the learner submits a result link (e.g. a GitHub
  repository, deployment link, or shared document), so make the study case
  implementable enough that a link can be submitted.
"#,
        course_title = chapter.course_title,
        course_description = chapter.course_description,
        title = chapter.title,
        description = chapter.description,
        order_index = chapter.order_index,
        is_study_case = chapter.is_study_case,
    )
}

/// Build the grading prompt for a study-case submission.
pub fn grading_prompt(
    assignment: &str,
    proof_url: &str,
    submission_note: &str,
    code_snippet: &str,
) -> String {
    let snippet_section = if code_snippet.is_empty() {
        String::new()
    } else {
        format!("- Code excerpt:\n```\n{code_snippet}\n```\n")
    };

    format!(
        r#"Act as a senior engineer grading a learner's assignment.

ASSIGNMENT:
{assignment}

LEARNER SUBMISSION:
- URL: {proof_url}
- Explanation: "{submission_note}"
{snippet_section}
TASK:
Grade the submission's relevance to the assignment (0-100).
- If code is present, check whether it follows the instructions.
- If no code is present, grade the reasoning in the explanation.
- Give brief feedback (at most 2 sentences).

Output JSON only:
{{ "score": number, "feedback": string }}
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn chapter() -> ChapterContext {
        ChapterContext {
            id: Uuid::new_v4(),
            course_id: Uuid::new_v4(),
            order_index: 3,
            title: "Ownership and Borrowing".to_string(),
            description: "How Rust manages memory without a GC.".to_string(),
            content: None,
            is_study_case: false,
            score: 0,
            video_url: None,
            video_url_embed: None,
            course_title: "Practical Rust".to_string(),
            course_description: "A hands-on Rust course.".to_string(),
        }
    }

    #[test]
    fn chapter_prompt_includes_course_and_chapter_context() {
        let prompt = chapter_prompt(&chapter());
        assert!(prompt.contains("Practical Rust"));
        assert!(prompt.contains("## Chapter 3: Ownership and Borrowing"));
        assert!(prompt.contains("How Rust manages memory without a GC."));
        assert!(prompt.contains("Is this chapter a study case: false"));
    }

    #[test]
    fn grading_prompt_embeds_evidence_when_present() {
        let prompt = grading_prompt(
            "Build a replicated log.",
            "https://github.com/a/b",
            "Implements Raft.",
            "fn main() {}",
        );
        assert!(prompt.contains("Build a replicated log."));
        assert!(prompt.contains("https://github.com/a/b"));
        assert!(prompt.contains("fn main() {}"));
        assert!(prompt.contains(r#"{ "score": number, "feedback": string }"#));
    }

    #[test]
    fn grading_prompt_omits_empty_snippet_section() {
        let prompt = grading_prompt("Assignment", "https://x", "note", "");
        assert!(!prompt.contains("Code excerpt"));
    }
}
