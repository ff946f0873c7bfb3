//! Prompt builders for the four generator operations.
//!
//! Every prompt targets a single Java class named `ExampleSpringService`
//! built with Gradle, matching the layout the harness materializes.

use apidrift_core::{ApiChange, TestOutcome};

const CODE_SYSTEM: &str = "You are an expert Java programmer. \
Reply with a single Java source file and nothing else: no explanations, no tests, no main method.";

const BUILD_SYSTEM: &str = "You are an expert Java build engineer. \
Reply with a single Gradle (Groovy DSL) build file and nothing else.";

/// A system instruction plus the task text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    /// Both parts as one message, for models without a system role.
    pub fn combined(&self) -> String {
        format!("{}\n\n{}", self.system, self.user)
    }
}

fn task_section(change: &ApiChange) -> String {
    format!(
        "Task:\n{query}\n\nRequired method signature:\n```java\n{signature}\n```",
        query = change.query.trim(),
        signature = change.function_signature.trim(),
    )
}

fn code_requirements(change: &ApiChange) -> String {
    format!(
        "Requirements:\n\
         1. Implement only the method with the required signature.\n\
         2. The implementation must use this API: {name}\n\
         3. The code must compile against version {version} of {library}.\n\
         4. Put the method in `public class ExampleSpringService` with every import it needs.\n\
         5. Do not add comments.\n\n\
         Format:\n```java\n[imports]\n\npublic class ExampleSpringService {{\n    [method]\n}}\n```",
        name = change.name,
        version = change.to_version,
        library = change.library,
    )
}

fn build_requirements(change: &ApiChange) -> String {
    format!(
        "Requirements:\n\
         1. Declare every dependency the code needs to compile and run.\n\
         2. Target version {version} of {library}.\n\
         3. Tests use JUnit 5 through `useJUnitPlatform()`.\n\n\
         Format:\n```groovy\n\
         plugins {{\n    id 'java'\n}}\n\n\
         repositories {{\n    mavenCentral()\n}}\n\n\
         dependencies {{\n    implementation 'org.springframework:spring-context:{version}'\n    \
         testImplementation 'org.junit.jupiter:junit-jupiter:5.10.2'\n    \
         testRuntimeOnly 'org.junit.platform:junit-platform-launcher'\n}}\n\n\
         test {{\n    useJUnitPlatform()\n}}\n```",
        version = change.to_version,
        library = change.library,
    )
}

/// Test feedback from a previous attempt: build output, error output and
/// any failing test cases.
fn feedback_section(outcome: &TestOutcome) -> String {
    let mut out = String::from("Test results from the previous attempt:\n");
    if let Some(output) = non_blank(outcome.output.as_deref()) {
        out.push_str(&format!("Output:\n{}\n", output.trim()));
    }
    if let Some(errors) = non_blank(outcome.error_output.as_deref()) {
        out.push_str(&format!("Errors:\n{}\n", errors.trim()));
    }
    for case in outcome.test_results.iter().filter(|c| !c.success) {
        out.push_str(&format!(
            "Failed: {}.{}: {}\n",
            case.class_name,
            case.test_name,
            case.failure.as_deref().unwrap_or("no message")
        ));
    }
    out
}

fn non_blank(text: Option<&str>) -> Option<&str> {
    text.filter(|s| !s.trim().is_empty())
}

fn previous_attempt(code: &str, build: &str) -> String {
    format!(
        "Your source code from the previous attempt:\n```java\n{code}\n```\n\n\
         Your build file from the previous attempt:\n```groovy\n{build}\n```"
    )
}

pub fn generate_code(change: &ApiChange) -> Prompt {
    let task = task_section(change);
    let requirements = code_requirements(change);
    Prompt {
        system: CODE_SYSTEM.to_string(),
        user: format!("{task}\n\n{requirements}"),
    }
}

pub fn generate_build_config(change: &ApiChange, code: &str) -> Prompt {
    Prompt {
        system: BUILD_SYSTEM.to_string(),
        user: format!(
            "{}\n\nGenerated code:\n```java\n{code}\n```\n\n{}",
            task_section(change),
            build_requirements(change),
        ),
    }
}

pub fn repair_code(
    change: &ApiChange,
    previous_code: &str,
    previous_build: &str,
    previous_outcome: &TestOutcome,
) -> Prompt {
    Prompt {
        system: CODE_SYSTEM.to_string(),
        user: format!(
            "You previously wrote a Java method and a Gradle build file for this task, \
             and its tests failed.\n\n{}\n\n{}\n\n{}\n\n{}\n\
             Write a new implementation that fixes the errors above.",
            task_section(change),
            code_requirements(change),
            previous_attempt(previous_code, previous_build),
            feedback_section(previous_outcome),
        ),
    }
}

pub fn repair_build_config(
    change: &ApiChange,
    new_code: &str,
    previous_code: &str,
    previous_build: &str,
    previous_outcome: &TestOutcome,
) -> Prompt {
    Prompt {
        system: BUILD_SYSTEM.to_string(),
        user: format!(
            "You previously wrote a Java method and a Gradle build file for this task, \
             and its tests failed.\n\n{}\n\n{}\n\n{}\n\n{}\n\
             The method has been rewritten as:\n```java\n{new_code}\n```\n\n\
             Write a new build file with every dependency the rewritten code needs.",
            task_section(change),
            build_requirements(change),
            previous_attempt(previous_code, previous_build),
            feedback_section(previous_outcome),
        ),
    }
}
