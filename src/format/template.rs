use super::FormatError;

/// Renders `{{ TOKEN }}` placeholders, resolving each token through `resolve`.
pub fn render_placeholders<F>(template: &str, mut resolve: F) -> Result<String, FormatError>
where
    F: FnMut(&str) -> Result<String, FormatError>,
{
    let mut rendered = String::with_capacity(template.len());
    let mut cursor = template;

    while let Some(start) = cursor.find("{{") {
        rendered.push_str(&cursor[..start]);
        let after_open = &cursor[start + 2..];
        let Some(close_offset) = after_open.find("}}") else {
            return Err(FormatError::Template(
                "unclosed placeholder in template".to_string(),
            ));
        };
        let token = after_open[..close_offset].trim();
        if token.is_empty() {
            return Err(FormatError::Template(
                "empty placeholder in template".to_string(),
            ));
        }
        rendered.push_str(&resolve(token)?);
        cursor = &after_open[close_offset + 2..];
    }

    rendered.push_str(cursor);
    Ok(rendered)
}

pub fn builtin_template(crop: &str) -> Option<&'static str> {
    match crop {
        "maize" => Some(MAIZE_TEMPLATE),
        _ => None,
    }
}

// Placeholders are laid out so that each rendered value ends on its header's
// last column.
const MAIZE_TEMPLATE: &str = r"*EXP.DETAILS: {{EXP_CODE}}MZ {{LOC}}

*GENERAL
@PEOPLE
-99
@ADDRESS
-99
@SITE
{{LOC}}

*TREATMENTS                        -------------FACTOR LEVELS------------
@N R O C TNAME.................... CU FL SA IC MP MI MF MR MC MT ME MH SM
 1 1 0 0 DABBLER SIMULATION         1  1  0  1  1  1  0  0  0  0  0  1  1

*CULTIVARS
@C CR INGENO CNAME
 1 MZ {{CULT}} DABBLER

*FIELDS
@L ID_FIELD WSTA....  FLSA  FLOB  FLDT  FLDD  FLDS  FLST SLTX  SLDP  ID_SOIL    FLNAME
 1 {{FLD_ID}} {{WST}}   -99     0 DR000     0     0 00000 -99    180  {{SOIL_IDN}} -99
@L ...........XCRD ...........YCRD .....ELEV .............AREA .SLEN .FLWR .SLAS FLHST FHDUR
 1 {{XCRD}} {{YCRD}}       -99               -99   -99   -99   -99   -99   -99

*INITIAL CONDITIONS
@C   PCR ICDAT  ICRT  ICND  ICRN  ICRE  ICWD ICRES ICREN ICREP ICRIP ICRID ICNAME
 1    MZ {{SDT}}   100   -99     1     1   -99  1000    .8     0   100    15 -99
@C  ICBL  SH2O  SNH4  SNO3
 1    20  .200    .5   1.5
 1    40  .200    .5   1.5
 1    60  .200    .5   1.5
 1    90  .200    .5   1.5
 1   120  .200    .5   1.5

*PLANTING DETAILS
@P PDATE EDATE  PPOP  PPOE  PLME  PLDS  PLRS  PLRD  PLDP  PLWT  PAGE  PENV  PLPH  SPRL                        PLNAME
 1 {{PLF}}   -99   7.2   7.2     S     R    61     0     7   -99   -99   -99   -99   -99                        -99

*IRRIGATION AND WATER MANAGEMENT
@I  EFIR  IDEP  ITHR  IEPT  IOFF  IAME  IAMT IRNAME
 1     1    30    50   100 GS000 IR001    10 -99

*HARVEST DETAILS
@H HDATE  HSTG  HCOM HSIZE   HPC  HBPC HNAME
 1 {{HDT}} GS000   -99   -99   -99   -99 -99

*SIMULATION CONTROLS
@N GENERAL     NYERS NREPS START SDATE RSEED SNAME.................... SMODEL
 1 GE          {{NYERS}}     1     S {{SDT}}  2150 DABBLER SIMULATION        {{MDL}}
@N OPTIONS     WATER NITRO SYMBI PHOSP POTAS DISES  CHEM  TILL   CO2
 1 OP              Y     Y     Y     N     N     N     N     N     M
@N METHODS     WTHER INCON LIGHT EVAPO INFIL PHOTO HYDRO NSWIT MESOM MESEV MESOL
 1 ME              M     M     E     R     S     L     R     1     G     S     2
@N MANAGEMENT  PLANT IRRIG FERTI RESID HARVS
 1 MA              R     {{IRR}}     N     N     R
@N OUTPUTS     FNAME OVVEW SUMRY FROPT GROUT CAOUT WAOUT NIOUT MIOUT DIOUT VBOSE CHOUT OPOUT FMOPT
 1 OU              N     Y     Y     1     Y     Y     Y     Y     N     N     Y     N     N     A

@  AUTOMATIC MANAGEMENT
@N PLANTING    PFRST PLAST PH2OL PH2OU PH2OD PSTMX PSTMN
 1 PL          {{PLF}} {{PLL}}    40   100    30    40    10
@N IRRIGATION  IMDEP ITHRL ITHRU IROFF IMETH IRAMT IREFF
 1 IR             30    50   100 GS000 IR001    10     1
@N NITROGEN    NMDEP NMTHR NAMNT NCODE NAOFF
 1 NI             30    50    25 FE001 GS000
@N RESIDUES    RIPCN RTIME RIDEP
 1 RE            100     1    20
@N HARVEST     HFRST HLAST HPCNP HPCNR
 1 HA          {{HVF}} {{HVL}}   100     0
@N FORECAST    FODAT
 1 FO        {{FODAT}}
";
