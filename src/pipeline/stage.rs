//! Pipeline stages: roles, personas and dependency declarations.

use std::fmt;

use serde::Serialize;

/// One of the four fixed agent roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Analyst,
    TechLead,
    Writer,
    Architect,
}

impl Stage {
    /// Declared order; reporting and sequential scheduling follow it
    pub const ALL: [Stage; 4] = [
        Stage::Analyst,
        Stage::TechLead,
        Stage::Writer,
        Stage::Architect,
    ];

    /// Human-readable role name used in prompts, logs and failure text
    pub fn role(&self) -> &'static str {
        match self {
            Stage::Analyst => "Analyst",
            Stage::TechLead => "Tech Lead",
            Stage::Writer => "Writer",
            Stage::Architect => "Architect",
        }
    }

    /// Stages whose output this stage consumes
    pub fn dependencies(&self) -> &'static [Stage] {
        match self {
            Stage::Analyst => &[],
            Stage::TechLead => &[Stage::Analyst],
            Stage::Writer => &[Stage::Analyst, Stage::TechLead],
            Stage::Architect => &[Stage::Analyst],
        }
    }

    /// Fixed system identity placed ahead of the input
    pub fn persona(&self) -> &'static str {
        match self {
            Stage::Analyst => ANALYST_PERSONA,
            Stage::TechLead => TECH_LEAD_PERSONA,
            Stage::Writer => WRITER_PERSONA,
            Stage::Architect => ARCHITECT_PERSONA,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.role())
    }
}

// =============================================================================
// Personas
// =============================================================================

const ANALYST_PERSONA: &str = "You are a Senior Code Analyst. \
Your job is NOT to write documentation, but to READ raw code and extract facts. \
Output a structured summary containing: \
1. List of all languages used. \
2. The probable entry point of the app (eg., main.py, index.js). \
3. A list of external libraries/dependencies imported. \
4. A high level description of the data flow. \
Be concise and factual.";

const TECH_LEAD_PERSONA: &str = "You are a cynical Technical Lead. \
You are reviewing a codebase analysis. \
Identify 3 potential \"red flags\" or areas of concern, such as: \
Security risks(hardcodes keys). \
Deprecated libraries. \
Lack of error handling. \
Poor variable naming. \
If the code looks perfect admit it, but try to find improvements";

const WRITER_PERSONA: &str = "You are a Technical Writer specializing in documentation for legacy systems.

You will receive:
1. a code analysis.
2. A tech Leads critique.

Your goal: Write a professional README.md file.
Structure:
# [Project Name]
## Overview
## Tech stack
## Key Features
## Maintenance Warning (Include the tech leads red flags here)
## Getting started";

const ARCHITECT_PERSONA: &str = "You are a Senior Software Architect. \
Your goal is to map the dependencies of a legacy codebase using Mermaid.js. \
STRICT RULES: \
1. Use ONLY the actual filenames found in the codebase. DO NOT invent files like \"AI_Pipeline\" or \"Core\" if they don't exist. \
2. If 'app.py' imports 'agents.py', draw: app.py --> agents.py \
3. Use the 'graph TD' layout. \
4. Style the nodes: \
- Use [Square Brackets] for Python/Code files. \
- Use (Round Brackets) for External Libraries (like streamlit, google-genai). \
Output ONLY the Mermaid code. No markdown backticks.";

// =============================================================================
// Input assembly
// =============================================================================

/// Build a stage's input from the raw blob and its predecessors' forwarded text.
///
/// `upstream` must return the forwarded text for any stage listed in
/// [`Stage::dependencies`].
pub fn build_input<'a, F>(stage: Stage, raw: &str, upstream: F) -> String
where
    F: Fn(Stage) -> &'a str,
{
    match stage {
        Stage::Analyst => raw.to_string(),
        Stage::TechLead => format!(
            "RAW CODE:\n{}\n\nANALYSIS:\n{}",
            raw,
            upstream(Stage::Analyst)
        ),
        Stage::Writer => format!(
            "ANALYSIS:\n{}\n\nCRITIQUE:\n{}",
            upstream(Stage::Analyst),
            upstream(Stage::TechLead)
        ),
        Stage::Architect => format!("ANALYSIS_SUMMARY:\n{}", upstream(Stage::Analyst)),
    }
}
