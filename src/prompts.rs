// src/prompts.rs
//! Instruction text sent to the generative backend. Everything here is pure;
//! nothing in this module talks to the network.

use crate::models::{AspectRatio, ExtractionTarget};
use crate::services::image_processor::CHROMA_KEY_HEX;

pub const AD_COPY_PREFIX: &str = "+ 1";
pub const AD_COPY_SUFFIX: &str = "..!!!";

/// Name of the single field the analysis call must return.
pub const OUTFIT_FIELD: &str = "outfit";
/// Name of the single field the background enhancement call must return.
pub const BACKGROUND_FIELD: &str = "enhanced_background";

fn extraction_focus(target: ExtractionTarget) -> &'static str {
    match target {
        ExtractionTarget::Top => {
            "Identify ONLY the upper-body garment(s) (shirt, t-shirt, blouse, jacket, etc.). \
             Describe nothing below the waist."
        }
        ExtractionTarget::Bottom => {
            "Identify ONLY the lower-body garment(s) (trousers, skirt, shorts, etc.). \
             Describe nothing above the waist."
        }
        ExtractionTarget::Full => {
            "Identify the ENTIRE outfit the person is wearing, from top to bottom."
        }
    }
}

pub fn analysis_prompt(target: ExtractionTarget) -> String {
    format!(
        r#"You are a digital fashion forensics expert. Produce a micrometre-level inspection report of the clothing in this image.

PRIORITY TASK: {focus}

Once the priority item(s) are identified, run the MANDATORY INSPECTION PROCEDURE on those items only. Ignore every garment, accessory, hair, face or anything else outside the priority task.

TECHNICAL MINDSET, NO CREATIVITY:
* You are a 3D scanner, not a designer.
* Every word must correspond to a pixel.

MANDATORY INSPECTION PROCEDURE (priority items only):
1. CLASSIFY & LIST: name each priority item.
2. COLOUR (LAB GRADE): give the EXACT hex code of every colour on each item.
3. MATERIAL & TEXTURE: describe surface texture, sheen, thickness, and how it drapes and folds.
4. SILHOUETTE & CUT: describe the shape, length, neckline, sleeves, hems and seams of each item.
5. PATTERNS: analyse like a mathematician: motif size, spacing and repeat rule.
6. EMBELLISHMENTS: NO DETAIL IS TOO SMALL. Buttons, zips, embroidery, lace, prints, labels.

OUTPUT REQUIREMENTS:
* NEVER describe the model (face, hair, skin, body), the background, or anything outside the priority item(s).
* Return the whole report as a single JSON object with exactly one key: '{field}'."#,
        focus = extraction_focus(target),
        field = OUTFIT_FIELD,
    )
}

pub fn variation_prompt(
    outfit: &str,
    background: &str,
    aspect_ratio: &AspectRatio,
    camera_angle: &str,
) -> String {
    format!(
        r#"TASK: Digital transplant. Change ONLY the outfit and the scene.

MANDATORY RULES:
1. KEEP THE ORIGINAL PERSON 100%: keep exactly the person in the source image: face, expression, hairstyle, hair colour, skin tone and body shape. DO NOT CHANGE THEM.
2. CHROMA-KEY BACKGROUND (ABSOLUTE REQUIREMENT): the input image is surrounded by a bright green ({chroma}) area. You MUST ERASE and COMPLETELY REPLACE 100% of that green area with the scene described below. This is the most important rule. NOT A SINGLE green pixel may remain. The whole frame must be filled.
3. BUILD THE OUTFIT FROM THE TECHNICAL DRAWING: the outfit description below is a fixed technical specification. Reproduce every detail exactly. Interpreting, inventing, adding, removing or altering any detail is STRICTLY FORBIDDEN.
4. CHANGES: change only the outfit and the scene, based on the descriptions below.
5. ASPECT RATIO: the output image must have an aspect ratio of exactly {aspect}.
6. CAMERA ANGLE: shoot from this angle: {angle}.
7. QUALITY: photorealistic, 4K, highly detailed and sharp.

DETAILED DESCRIPTION:
- Outfit: {outfit}
- Scene: {background}

OUTPUT: return a single image only. Do not return any text."#,
        chroma = CHROMA_KEY_HEX,
        aspect = aspect_ratio,
        angle = camera_angle,
        outfit = outfit,
        background = background,
    )
}

pub fn ad_copy_prompt(language: &str) -> String {
    format!(
        r#"Your role is a creative social media marketer for a trendy fashion brand targeting Gen Z.
Based on the fashion item in the image(s), write a short, catchy and stylish promotional caption in {language}.
- The tone should be youthful and confident, with trendy slang where it fits.
- The caption must start with the characters "{prefix}".
- Describe the item's key features or vibe in an exciting way.
- Keep it concise, around 20-30 words.
- The caption must end with '{suffix}'"#,
        language = language,
        prefix = AD_COPY_PREFIX,
        suffix = AD_COPY_SUFFIX,
    )
}

pub fn poster_prompt() -> &'static str {
    r#"From the source image, create a single, new, professional promotional image with a 9:16 aspect ratio, perfect for social media stories.
This new image MUST feature three artistic variations of the same person from the source photo, composed together in a stylish layout.
- It is absolutely critical that the face of the person in all three variations is an exact and faithful representation of the face in the source image. Do not alter their facial features, identity, or ethnicity.
- One variation should be the main focus: positioned centrally, clear and sharp.
- The other two variations should be secondary: placed in the background on the left and right, perhaps larger and slightly faded or stylized to create depth.
- Each of the three variations must have a different, flattering pose and expression that showcases the clothing from different angles.
- Crucially, you must replace the original background with a new, stylish, and complementary background that fits a modern fashion aesthetic. This could be a clean studio backdrop, a soft abstract gradient, or a subtle, out-of-focus lifestyle scene. The background should enhance the subject, not distract from them.
- The final output must be a single, complete image with the subject variations and the new background integrated seamlessly. Do not add any text, logos, or banners."#
}

pub fn background_enhancement_prompt(background: &str) -> String {
    format!(
        r#"You are an art director for high-end fashion photo shoots. Take this simple scene description: "{background}".
Turn it into a detailed, vivid and inspiring paragraph suited to a fashion shoot. Focus on:
1. Lighting: the light source (natural or artificial), direction, intensity and colour. Does it cast artistic shadows?
2. Materials & texture: add concrete details. For example, instead of 'brick wall' write 'a raw terracotta brick wall dotted with patches of green moss'.
3. Atmosphere: the mood of the scene (romantic, mysterious, luxurious, energetic, peaceful).
4. Secondary elements: extra details that enrich the scene (morning mist, falling petals, a vintage armchair).
5. Language: rich, evocative imagery.

Return the result as a JSON object with a single key: '{field}'."#,
        background = background,
        field = BACKGROUND_FIELD,
    )
}
