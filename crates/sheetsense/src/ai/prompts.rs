//! Fixed instructions for the analysis stages.
//!
//! Every run issues these in order against the same rendered page set:
//! vendor code, full report, tag extraction, checklist generation. The
//! wording is part of the product behavior — downstream parsing relies on
//! the fenced JSON shapes requested here.

/// Stage 1 — vendor code only, no commentary.
pub const VENDOR_CODE: &str = "Extract the vendor part code from this document or image. \
Answer with the vendor code only, without any other commentary.";

/// Stage 2 — full multi-section report over the rendered pages.
pub const REPORT: &str = "This document is the datasheet of a circuit component.
1. Analyze the datasheet or schematic image pages.
2. Find the vendor part code and analyze the datasheet for that part.
3. Derive PCB artwork guidance for the part.
4. Answer using the format below.
[Format]
## 1. Datasheet analysis
----------------
### 1.1 Key characteristics

*   Input voltage range, output voltage/current, switching frequency
*   Protection features and notable operating limits

### 1.2 Pin assignment and functions
|Pin|Name|Function|
|---|----|--------|

### 1.3 Recommended external components and reference circuit

*   Input/output capacitors, inductors, diodes, resistor dividers with values

## 2. PCB artwork information
*   Clearance and trace-length guidance between specific components
*   Net-to-net clearance requirements
*   Other routing cautions derived from the datasheet
*   Physical part data needed to build a library footprint (pin pitch, body size)";

/// Stage 3 instruction — appended to the report text.
const TAGS: &str = "1. Produce IC tag information as JSON so it can be used as search metadata.
2. You may create tags with names beyond the example.
3. If the datasheet was analyzed, a tag named Model is mandatory. Do not emit a Model tag when no vendor code was found.
[Example]
```
[
    {
        'Name' : 'Model',
        'Description' : 'MAX5033A',
    },
    {
        'Name' : 'Input voltage',
        'Description' : '10.5V DC'
    },
    {
        'Name' : 'Output voltage',
        'Description' : '3.3V DC'
    },
    {
        'Name' : 'Converter type',
        'Description' : 'Buck (Step-Down)'
    },
]
```";

/// Stage 4 instruction — appended to the report text.
const CHECKLIST: &str = "List the points that must be verified when the schematic for this \
datasheet is drawn. For an IC, list per pin which components must be connected and where \
pull-ups, pull-downs, supply or GND connections are required. Return the list as JSON, \
as a plain array of strings. Use (VendorCode) for the part code found in the datasheet.
Phrase each entry as a verification request, for example: \
`Verify that the VIN pin of (VendorCode) is connected to the input supply with a decoupling \
capacitor (typically 10 uF) to GND`.";

/// Builds the stage 3 request from the stage 2 report.
pub fn tag_extraction(report: &str) -> String {
    format!("Analysis result:\n{}\n\n{}", report, TAGS)
}

/// Builds the stage 4 request from the stage 2 report.
pub fn checklist_generation(report: &str) -> String {
    format!("Analysis result:\n{}\n\n{}", report, CHECKLIST)
}

/// Builds the per-checklist-item prompt for the external code generator.
pub fn code_synthesis(vendor_code: &str, checkpoint: &str) -> String {
    format!(
        "Create Python code for VendorCode {}. Requirement: {}. Output only python code.",
        vendor_code, checkpoint
    )
}
