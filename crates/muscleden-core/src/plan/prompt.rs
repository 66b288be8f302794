//! Prompt construction for plan generation. Pure string building.

use crate::plan::request::PlanRequest;

/// Sampling temperature used for plan generation. Kept low so the model
/// sticks to the required JSON shape.
pub const PLAN_TEMPERATURE: f32 = 0.2;

/// The exact output contract included at the end of every prompt.
const OUTPUT_CONTRACT: &str = r#"Finally, you MUST return exactly one JSON object, and it must be valid JSON with the following structure:
{
  "fitnessPlan": "your markdown plan here...",
  "youtubeLinks": [
    { "title": "Video Title 1", "url": "https://youtube.com/watch?v=..." },
    { "title": "Video Title 2", "url": "https://youtube.com/watch?v=..." }
  ]
}

Do not include any text or formatting outside of this JSON object.
"#;

/// Build the generation prompt for a validated request.
pub fn build_prompt(request: &PlanRequest) -> String {
    let mut prompt = String::with_capacity(2048);

    prompt.push_str(
        "You are a personal fitness trainer. Your task is to generate a personalized \
         fitness plan and find relevant YouTube videos based on the user's details.\n\n",
    );

    prompt.push_str(
        "First, create a detailed and personalized fitness plan for the following user:\n",
    );
    prompt.push_str(&format!("Name: {}\n", request.name()));
    prompt.push_str(&format!("Age: {}\n", request.age()));
    prompt.push_str(&format!("Weight: {} kg\n", request.weight_kg()));
    prompt.push_str(&format!("Height: {} cm\n", request.height_cm()));
    prompt.push_str(&format!("Fitness Goals: {}\n", request.fitness_goals()));
    if let Some(pref) = request.exercise_preference() {
        prompt.push_str(&format!("Exercise Preference: {pref}\n"));
    }
    prompt.push('\n');

    prompt.push_str(
        "The 'fitnessPlan' must be a complete, well-structured document formatted in \
         Markdown. Use headings, bold text, and lists to detail workout routines, \
         frequency, duration, and dietary suggestions. The plan must be realistic and \
         sustainable.\n\n",
    );

    prompt.push_str(
        "Second, after creating the plan, find 3 to 5 relevant YouTube videos that could \
         help the user with their diet (e.g., healthy recipes, meal prep ideas that align \
         with the dietary suggestions). For each video, provide its title and a valid URL.\n\n",
    );

    prompt.push_str(OUTPUT_CONTRACT);
    prompt
}
