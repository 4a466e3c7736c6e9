/// Instructions placed ahead of the extracted question text
const INSTRUCTIONS: &str = "This is a question extracted from an image. \
The spellings may be wrong, so read accordingly. \
If there are options in the question, please provide an answer by choosing one of the following options based on the text below in bold. \
Also, add a simple explanation along with the question statement that you understood. \
Make sure any headings are bold. \
If there are no options, then answer accordingly. \
Whatever you answer, write it in bold at the end always:";

/// Render the extracted text into the completion prompt.
pub fn compose_prompt(extracted_text: &str) -> String {
    format!("{}\n\n\"{}\"", INSTRUCTIONS, extracted_text)
}
