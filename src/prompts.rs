use crate::models::ProductCategory;

/// Directive persona for scenario generation. Each category carries its own
/// creative voice and a few scenario archetypes to push the model toward
/// diverse lighting, mood and setting.
pub fn scenario_system_instruction(category: ProductCategory) -> &'static str {
    match category {
        ProductCategory::Jewelry => {
            "You are a Creative Director for a high-end luxury jewelry house. \
             Propose 3 distinct, cinematic visual environments for this jewelry asset. \
             Focus on lighting, texture, and editorial composition. Output strictly JSON."
        }
        ProductCategory::Restaurant => {
            "You are a Michelin-star hospitality designer. Propose 3 distinct dining \
             atmospheres for this product: 1. Midnight Intimacy. 2. Bright Organic. \
             3. Industrial Avant-Garde. Output strictly JSON."
        }
        ProductCategory::Fashion => {
            "You are a lead editor at a global fashion magazine. Propose 3 editorial \
             scenarios: 1. Urban Brutalism. 2. Desert High-Fashion. 3. Retro-Futurist \
             Studio. Output strictly JSON."
        }
    }
}

/// User-turn request paired with the inline product image.
pub fn scenario_request(brief: &str, category: ProductCategory) -> String {
    format!(
        "Asset Type: {category}. Brief: {brief}. Propose 3 detailed scenarios for a 4K render.\n\n\
         Return ONLY valid JSON with a single top-level object that has a \"scenarios\" array of \
         exactly 3 short descriptive strings. Do NOT include any explanations, markdown, or extra \
         text.\n\n\
         Example output:\n\
         {{\"scenarios\":[\"Studio-lit closeup with dramatic rim light and deep shadows.\",\
         \"Minimalist gallery with soft diffuse window light and reflective surfaces.\",\
         \"Opulent cinematic interior with warm golden highlights and shallow depth-of-field.\"]}}"
    )
}

/// Fixed per-category scenario set used whenever the model path cannot
/// deliver three usable strings. The pipeline never blocks on this step.
pub fn default_scenarios(category: ProductCategory) -> [&'static str; 3] {
    match category {
        ProductCategory::Jewelry => [
            "Minimalist Architectural Studio",
            "Luxury Boutique Interior",
            "Cinematic Sunset Balcony",
        ],
        ProductCategory::Restaurant => [
            "Midnight Intimacy Dining Room",
            "Bright Organic Morning Terrace",
            "Industrial Avant-Garde Chef's Counter",
        ],
        ProductCategory::Fashion => [
            "Urban Brutalism Concrete Backdrop",
            "Desert High-Fashion Dune Set",
            "Retro-Futurist Chrome Studio",
        ],
    }
}

/// Sample scenarios served in dev-fallback mode, no model call involved.
pub fn sample_scenarios(category: ProductCategory) -> Vec<String> {
    vec![
        format!("Luxurious studio-lit setting with dramatic chiaroscuro highlighting the {category} piece."),
        "Ultra-minimal gallery space with soft natural window light and reflective surfaces.".to_string(),
        "Opulent cinematic interior with warm gold accents and shallow depth-of-field.".to_string(),
    ]
}

/// Primary synthesis directive: technical-quality block plus the scenario.
pub fn render_prompt(scenario: &str, category: ProductCategory) -> String {
    format!(
        "TASK: High-Fidelity 4K Neural Integration.\n\
         PRODUCT: {category}.\n\
         ENVIRONMENT: {scenario}.\n\n\
         TECHNICAL SPECS:\n\
         - 4K resolution, macro sharpness.\n\
         - Perfect ray-traced shadows and reflections.\n\
         - Product must be the focal center, uncropped and whole.\n\
         - Cinematic editorial lighting grade."
    )
}

/// Second-attempt directive for the faster fallback model, with the
/// anti-cropping requirement strengthened.
pub fn render_fallback_prompt(scenario: &str, category: ProductCategory) -> String {
    format!(
        "Photorealistic product render. PRODUCT: {category}. ENVIRONMENT: {scenario}. \
         CRITICAL: the entire product must remain fully visible, centered and uncropped, \
         with every edge of the product inside the frame. Sharp focus on the product, \
         realistic lighting integration with the environment."
    )
}

/// Companion plate: environment only, for separate display/download.
pub fn background_prompt(scenario: &str, category: ProductCategory) -> String {
    format!(
        "Wide establishing shot of: {scenario}. Empty environment context suited to {category} \
         photography. Strictly no people, no products, no text. Cinematic editorial lighting, \
         4K resolution."
    )
}

/// Refinement directive: echoes the instruction, pins identity/resolution,
/// and adds focus hints inferred from keywords in the instruction.
pub fn refinement_prompt(instruction: &str) -> String {
    let mut hints: Vec<&str> = Vec::new();
    let lowered = instruction.to_lowercase();
    if ["sharp", "crisp", "focus"].iter().any(|k| lowered.contains(k)) {
        hints.push("maximize micro-contrast and edge sharpness");
    }
    if ["sparkle", "shine", "glint", "luster"].iter().any(|k| lowered.contains(k)) {
        hints.push("intensify specular highlights and facet reflections");
    }
    if ["warm", "golden", "sunset"].iter().any(|k| lowered.contains(k)) {
        hints.push("shift the lighting grade toward warm golden tones");
    }
    if ["texture", "detail", "macro"].iter().any(|k| lowered.contains(k)) {
        hints.push("enhance material texture detail");
    }

    let mut prompt = format!(
        "REFINEMENT: {instruction}. Maintain 4K clarity and preserve the product's identity, \
         framing and resolution. Improve lighting, material textures, and atmospheric depth \
         for a high-end luxury look."
    );
    if !hints.is_empty() {
        prompt.push_str(&format!(" Focus on: {}.", hints.join("; ")));
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn every_category_has_three_nonempty_defaults() {
        for category in ProductCategory::all() {
            let defaults = default_scenarios(category);
            assert_eq!(defaults.len(), 3);
            assert!(defaults.iter().all(|s| !s.trim().is_empty()));
            let samples = sample_scenarios(category);
            assert_eq!(samples.len(), 3);
            assert!(samples.iter().all(|s| !s.trim().is_empty()));
        }
    }

    #[test]
    fn render_prompt_names_scenario_and_category() {
        let prompt = render_prompt("Luxury Boutique Interior", ProductCategory::Jewelry);
        assert!(prompt.contains("Luxury Boutique Interior"));
        assert!(prompt.contains("JEWELRY"));
        assert!(prompt.contains("uncropped"));
    }

    #[test]
    fn background_prompt_excludes_subjects() {
        let prompt = background_prompt("Desert High-Fashion Dune Set", ProductCategory::Fashion);
        assert!(prompt.contains("no people"));
        assert!(prompt.contains("no products"));
    }

    #[test]
    fn refinement_keywords_map_to_focus_hints() {
        let prompt = refinement_prompt("add sparkle and make it sharper");
        assert!(prompt.contains("specular highlights"));
        assert!(prompt.contains("edge sharpness"));

        let warm = refinement_prompt("warmer mood please");
        assert!(warm.contains("warm golden tones"));
        assert!(!warm.contains("specular"));

        // No recognized keyword: base directive only.
        let plain = refinement_prompt("make it pop");
        assert!(!plain.contains("Focus on:"));
        assert!(plain.contains("make it pop"));
    }
}
