//! # Marketing Crew Definitions
//!
//! The built-in crew: three agents and five tasks that turn a customer
//! domain and a project description into a marketing strategy with
//! campaign ideas and ad copy.

use crate::crew::{Agent, CrewSpec, Task};

pub const LEAD_MARKET_ANALYST: &str = "lead_market_analyst";
pub const CHIEF_MARKETING_STRATEGIST: &str = "chief_marketing_strategist";
pub const CREATIVE_CONTENT_CREATOR: &str = "creative_content_creator";

pub const RESEARCH_TASK: &str = "research_task";
pub const PROJECT_UNDERSTANDING_TASK: &str = "project_understanding_task";
pub const MARKETING_STRATEGY_TASK: &str = "marketing_strategy_task";
pub const CAMPAIGN_IDEA_TASK: &str = "campaign_idea_task";
pub const COPY_CREATION_TASK: &str = "copy_creation_task";

/// The Lead Market Analyst
///
/// Researches the customer and its competitors.
pub fn lead_market_analyst() -> Agent {
    Agent::new(
        LEAD_MARKET_ANALYST,
        "Lead Market Analyst",
        "Conduct amazing analysis of the products and competitors, providing in-depth \
         insights to guide marketing strategies.",
        "As the Lead Market Analyst at a premier digital marketing firm, you specialize \
         in dissecting online business landscapes.",
    )
}

/// The Chief Marketing Strategist
///
/// Turns research into a strategy.
pub fn chief_marketing_strategist() -> Agent {
    Agent::new(
        CHIEF_MARKETING_STRATEGIST,
        "Chief Marketing Strategist",
        "Synthesize amazing insights from product analysis to formulate incredible \
         marketing strategies.",
        "You are the Chief Marketing Strategist at a leading digital marketing agency, \
         known for crafting bespoke strategies that drive success.",
    )
}

/// The Creative Content Creator
///
/// Writes campaign ideas and ad copy.
pub fn creative_content_creator() -> Agent {
    Agent::new(
        CREATIVE_CONTENT_CREATOR,
        "Creative Content Creator",
        "Develop compelling and innovative content for social media campaigns, with a \
         focus on creating high-impact ad copies.",
        "As a Creative Content Creator at a top-tier digital marketing agency, you excel \
         in crafting narratives that resonate with audiences.",
    )
}

fn research_task() -> Task {
    Task::new(
        RESEARCH_TASK,
        LEAD_MARKET_ANALYST,
        "Conduct a thorough research about the customer and competitors in the context \
         of {customer_domain}. Make sure you find any interesting and relevant information \
         given the current year is {current_year}. We are working with them on the \
         following project: {project_description}.",
    )
    .with_expected_output(
        "A complete report on the customer and their customers and competitors, \
         including their demographics, preferences, market positioning and audience \
         engagement.",
    )
}

fn project_understanding_task() -> Task {
    Task::new(
        PROJECT_UNDERSTANDING_TASK,
        CHIEF_MARKETING_STRATEGIST,
        "Understand the project details and the target audience for \
         {project_description}. Review any provided materials and gather additional \
         information as needed.",
    )
    .with_expected_output(
        "A detailed summary of the project and a profile of the target audience.",
    )
}

fn marketing_strategy_task() -> Task {
    Task::new(
        MARKETING_STRATEGY_TASK,
        CHIEF_MARKETING_STRATEGIST,
        "Formulate a comprehensive marketing strategy for the project \
         {project_description} of the customer {customer_domain}. Use the insights from \
         the research task and the project understanding task to create a high-quality \
         strategy.",
    )
    .with_context(&[RESEARCH_TASK, PROJECT_UNDERSTANDING_TASK])
    .with_expected_output(
        "A detailed marketing strategy document that outlines goals, target audience, \
         key messages, proposed tactics, channels and KPIs.",
    )
}

fn campaign_idea_task() -> Task {
    Task::new(
        CAMPAIGN_IDEA_TASK,
        CREATIVE_CONTENT_CREATOR,
        "Develop creative marketing campaign ideas for {project_description}. Ensure the \
         ideas are innovative, engaging, and aligned with the overall marketing strategy.",
    )
    .with_expected_output(
        "A list of 5 campaign ideas, each with a short description and expected impact.",
    )
}

fn copy_creation_task() -> Task {
    Task::new(
        COPY_CREATION_TASK,
        CREATIVE_CONTENT_CREATOR,
        "Create marketing copies based on the approved campaign ideas for \
         {project_description}. Ensure the copies are compelling, clear, and tailored to \
         the target audience.",
    )
    .with_context(&[MARKETING_STRATEGY_TASK, CAMPAIGN_IDEA_TASK])
    .with_expected_output("Marketing copies for each campaign idea.")
}

/// Create the full marketing crew
///
/// Tasks in execution order:
/// 1. Research → 2. Project understanding → 3. Marketing strategy
/// → 4. Campaign ideas → 5. Copy creation (reads 3 and 4)
pub fn marketing_crew() -> CrewSpec {
    CrewSpec {
        name: "marketing_strategy".to_string(),
        agents: vec![
            lead_market_analyst(),
            chief_marketing_strategist(),
            creative_content_creator(),
        ],
        tasks: vec![
            research_task(),
            project_understanding_task(),
            marketing_strategy_task(),
            campaign_idea_task(),
            copy_creation_task(),
        ],
    }
}
